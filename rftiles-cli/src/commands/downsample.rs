//! Downsample command - build coarser zoom levels from a base zoom.

use std::path::PathBuf;

use clap::Args;
use rftiles::downsample::{DownsampleOptions, PyramidDownsampler, ShrinkFilter};
use rftiles::zoom::ZoomLevels;

use super::common::resolve_zooms;
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalArgs};

/// Arguments for the downsample command.
#[derive(Debug, Args)]
pub struct DownsampleArgs {
    /// Pyramid root
    #[arg(value_name = "DIR")]
    pub root: PathBuf,

    /// Populated zoom level to build from
    #[arg(value_name = "BASE_ZOOM")]
    pub base_zoom: u8,

    /// Zoom levels to write, as N or A-B (default: 0 to BASE_ZOOM-1)
    #[arg(short, long = "zoom", value_name = "ZOOM", num_args = 1..)]
    pub zoom: Vec<String>,

    /// Shrink filter: nearest or box (overrides [downsample] filter)
    #[arg(long, value_parser = parse_filter)]
    pub filter: Option<ShrinkFilter>,
}

fn parse_filter(value: &str) -> Result<ShrinkFilter, String> {
    value.parse()
}

/// Run the downsample command.
pub fn run(global: &GlobalArgs, args: DownsampleArgs) -> Result<(), CliError> {
    let base_zoom = args.base_zoom;
    let zooms = resolve_zooms(&args.zoom, || {
        Ok(ZoomLevels::default_downsample(base_zoom)?)
    })?;
    zooms.ensure_below(base_zoom)?;

    let runner = CliRunner::new(global)?;
    runner.log_startup("downsample");
    let config = runner.config();

    let options = DownsampleOptions::default()
        .with_workers(config.general.workers)
        .with_filter(args.filter.unwrap_or(config.downsample.filter));
    let downsampler = PyramidDownsampler::new(options)?;

    println!(
        "Downsampling {} from zoom {} to {}",
        args.root.display(),
        base_zoom,
        zooms
    );

    let summary = downsampler.downsample(&args.root, base_zoom, &zooms, runner.cancel_token())?;

    println!();
    println!("Downsample summary");
    println!("  Base tiles:    {}", summary.base_tiles);
    println!("  Tiles read:    {}", summary.tiles_read);
    println!("  Unreadable:    {}", summary.unreadable);
    println!("  Tiles written: {}", summary.written);
    println!("  Write errors:  {}", summary.failed);
    if summary.cancelled {
        println!("  Interrupted before completion");
    }

    Ok(())
}
