//! CLI runner for common setup.
//!
//! Encapsulates config loading, logging initialization and Ctrl-C handling
//! so each command handler starts from the same state.

use std::path::PathBuf;

use clap::Args;
use rftiles::config::ConfigFile;
use rftiles::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard, Verbosity};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Show progress information
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show debug information
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Config file (default: ~/.rftiles/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Worker threads (overrides [general] workers)
    #[arg(short = 'j', long = "jobs", global = true, value_name = "N")]
    pub jobs: Option<usize>,
}

impl GlobalArgs {
    /// Load the config file named by `--config`, or the default one.
    pub fn load_config(&self) -> Result<ConfigFile, CliError> {
        let config = match &self.config {
            Some(path) => {
                if !path.is_file() {
                    return Err(CliError::Config(format!(
                        "config file '{}' does not exist",
                        path.display()
                    )));
                }
                ConfigFile::load_from(path)?
            }
            None => ConfigFile::load()?,
        };
        Ok(config)
    }

    /// Apply command-line overrides to a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ConfigFile) -> Result<(), CliError> {
        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                return Err(CliError::Config("--jobs must be >= 1".to_string()));
            }
            config.general.workers = jobs;
        }
        Ok(())
    }
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration with CLI overrides applied
    config: ConfigFile,
    /// Cancelled on Ctrl-C
    cancel: CancellationToken,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    pub fn new(args: &GlobalArgs) -> Result<Self, CliError> {
        let mut config = args.load_config()?;
        args.apply_overrides(&mut config)?;

        let verbosity = Verbosity::from_flags(args.verbose, args.debug);
        let logging_guard = init_logging(&default_log_dir(), default_log_file(), verbosity)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let cancel = CancellationToken::new();
        let handler_token = cancel.clone();
        ctrlc::set_handler(move || {
            if handler_token.is_cancelled() {
                return;
            }
            warn!("Interrupted, finishing scheduled tiles");
            eprintln!("\nInterrupted, finishing scheduled tiles...");
            handler_token.cancel();
        })
        .map_err(|e| CliError::SignalHandler(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            cancel,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Token cancelled when the user presses Ctrl-C.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("rftiles v{}", rftiles::VERSION);
        info!(
            command = command,
            workers = self.config.general.workers,
            "rftiles CLI: {} command",
            command
        );
    }
}
