//! Merge command - combine tile pyramids with the signal priority rule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use rftiles::composite::{PriorityCompositor, TileCompositor};
use rftiles::merge::{MergeOptions, PyramidMerger};

use super::common::{print_failures, resolve_priority};
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalArgs};

/// Arguments for the merge command.
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Source pyramid roots
    #[arg(required = true, value_name = "SRC")]
    pub sources: Vec<PathBuf>,

    /// Destination pyramid root
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Signal color file defining priority (overrides [priority] file)
    #[arg(long, value_name = "FILE")]
    pub scf: Option<PathBuf>,
}

/// Run the merge command.
pub fn run(global: &GlobalArgs, args: MergeArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(global)?;
    runner.log_startup("merge");
    let config = runner.config();

    let table = resolve_priority(args.scf.as_deref(), config)?;
    let compositor: Arc<dyn TileCompositor> = Arc::new(PriorityCompositor::new(table));

    let options = MergeOptions::default()
        .with_workers(config.general.workers)
        .with_queue_factor(config.general.queue_factor);
    let merger = PyramidMerger::new(compositor, options);

    println!(
        "Merging {} pyramid(s) into {}",
        args.sources.len(),
        args.output.display()
    );

    let summary = merger.merge(&args.sources, &args.output, runner.cancel_token())?;

    println!();
    println!("Merge summary");
    println!("  Directories: {}", summary.directories);
    println!("  Tiles:       {}", summary.scheduled);
    println!("  Composited:  {}", summary.composited());
    println!("  Copied:      {}", summary.copied);
    println!("  Failed:      {}", summary.failed);
    if summary.skipped_directories > 0 {
        println!("  Skipped directories: {}", summary.skipped_directories);
    }
    print_failures(&summary.executor);
    if summary.cancelled {
        println!("  Interrupted before completion");
    }

    Ok(())
}
