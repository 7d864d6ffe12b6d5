//! Config command - print the effective configuration.

use clap::Args;
use rftiles::config::config_file_path;

use crate::error::CliError;
use crate::runner::GlobalArgs;

/// Arguments for the config command.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config file
    #[arg(long)]
    pub save: bool,

    /// Show the configuration file path only
    #[arg(long, conflicts_with = "save")]
    pub path: bool,
}

/// Run the config command.
pub fn run(global: &GlobalArgs, args: ConfigArgs) -> Result<(), CliError> {
    let path = global.config.clone().unwrap_or_else(config_file_path);

    if args.path {
        println!("{}", path.display());
        return Ok(());
    }

    let mut config = if path.exists() {
        global.load_config()?
    } else {
        Default::default()
    };
    global.apply_overrides(&mut config)?;

    if args.save {
        config.save_to(&path)?;
        println!("Saved configuration to {}", path.display());
        return Ok(());
    }

    println!("; {}", path.display());
    print!("{}", config.to_ini_string());
    Ok(())
}
