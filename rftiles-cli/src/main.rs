//! rftiles CLI - Command-line interface
//!
//! Drives the rftiles library through one subcommand per pipeline stage:
//! calculate, split, merge and downsample.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::{calculate, config, downsample, merge, split};
use runner::GlobalArgs;

#[derive(Parser)]
#[command(name = "rftiles")]
#[command(version = rftiles::VERSION)]
#[command(about = "Slippy-map tile pyramids from radio coverage rasters", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coverage calculator for one or more transmitter sites
    Calculate(calculate::CalculateArgs),

    /// Cut coverage rasters into a tile pyramid
    Split(split::SplitArgs),

    /// Merge tile pyramids, stronger signal wins
    Merge(merge::MergeArgs),

    /// Build coarser zoom levels from a populated base zoom
    Downsample(downsample::DownsampleArgs),

    /// Print the effective configuration
    Config(config::ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Calculate(args) => calculate::run(&cli.global, args),
        Commands::Split(args) => split::run(&cli.global, args),
        Commands::Merge(args) => merge::run(&cli.global, args),
        Commands::Downsample(args) => downsample::run(&cli.global, args),
        Commands::Config(args) => config::run(&cli.global, args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
