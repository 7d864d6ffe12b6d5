//! Split command - cut coverage rasters into tile pyramids.

use std::path::PathBuf;

use clap::Args;
use rftiles::split::{SplitOptions, SplitSummary, TileSplitter};
use rftiles::zoom::ZoomLevels;
use tracing::{info, warn};

use super::common::{ensure_dir, per_input_dir, resolve_zooms};
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalArgs};

/// Arguments for the split command.
#[derive(Debug, Args)]
pub struct SplitArgs {
    /// Coverage rasters, each with a .geo sidecar
    #[arg(required = true, value_name = "RASTER")]
    pub rasters: Vec<PathBuf>,

    /// Output pyramid root. With several rasters, each goes to <DIR>/<stem>
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Zoom levels, as N or A-B (default: 0-12)
    #[arg(short, long = "zoom", value_name = "ZOOM", num_args = 1..)]
    pub zoom: Vec<String>,

    /// Also write tiles without coverage
    #[arg(long = "including-blank-tiles")]
    pub blank_tiles: bool,
}

/// Run the split command.
pub fn run(global: &GlobalArgs, args: SplitArgs) -> Result<(), CliError> {
    let zooms = resolve_zooms(&args.zoom, || Ok(ZoomLevels::default_split()))?;

    let runner = CliRunner::new(global)?;
    runner.log_startup("split");
    let config = runner.config();

    let options = SplitOptions::default()
        .with_workers(config.general.workers)
        .with_blank_tiles(args.blank_tiles || config.tiles.blank_tiles);
    let splitter = TileSplitter::new(options)?;

    let single = args.rasters.len() == 1;
    let mut total = SplitSummary::default();
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for raster in &args.rasters {
        if runner.cancel_token().is_cancelled() {
            break;
        }
        let out_dir = if single {
            args.output.clone()
        } else {
            per_input_dir(&args.output, raster)
        };
        ensure_dir(&out_dir)?;

        println!("Splitting {} → {} (zoom {})", raster.display(), out_dir.display(), zooms);

        match splitter.split_file(raster, &out_dir, &zooms, runner.cancel_token()) {
            Ok(summary) => {
                println!(
                    "  {} tiles written, {} blank skipped, {} failed",
                    summary.written, summary.blank_skipped, summary.failed
                );
                total.absorb(&summary);
                succeeded += 1;
            }
            Err(e) => {
                warn!(raster = %raster.display(), error = %e, "Skipping raster");
                println!("  ✗ {}", e);
                failed += 1;
            }
        }
    }

    println!();
    println!("Split summary");
    println!("  Rasters:       {} ok, {} failed", succeeded, failed);
    println!("  Zoom levels:   {}", zooms);
    println!("  Tiles written: {}", total.written);
    println!("  Blank skipped: {}", total.blank_skipped);
    println!("  Tile failures: {}", total.failed);
    if total.cancelled || runner.cancel_token().is_cancelled() {
        println!("  Interrupted before completion");
    }
    info!(
        rasters = succeeded,
        failed_rasters = failed,
        written = total.written,
        failed_tiles = total.failed,
        "Split finished"
    );

    if succeeded == 0 && failed > 0 {
        return Err(CliError::NothingProcessed {
            command: "split",
            failed,
        });
    }
    Ok(())
}
