//! Calculate command - run the coverage calculator for each transmitter site.

use std::path::{Path, PathBuf};

use clap::Args;
use rftiles::site::{discover_sites, CalculationResult, RfCalculator, SplatCalculator, TxSite};
use tracing::{info, warn};

use super::common::ensure_dir;
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalArgs};

/// Arguments for the calculate command.
#[derive(Debug, Args)]
pub struct CalculateArgs {
    /// Transmitter site files (*.qth)
    #[arg(required = true, value_name = "SITE.qth")]
    pub sites: Vec<PathBuf>,

    /// Output directory for <site>.ppm and <site>.geo
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Calculator executable (overrides [calculator] binary)
    #[arg(long)]
    pub binary: Option<String>,

    /// Terrain directory (overrides [calculator] sdf_dir)
    #[arg(long, value_name = "DIR")]
    pub sdf_dir: Option<PathBuf>,

    /// Receiver height in metres (overrides [calculator] rx_height)
    #[arg(long, value_name = "METRES")]
    pub rx_height: Option<f64>,
}

/// Run the calculate command.
pub fn run(global: &GlobalArgs, args: CalculateArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(global)?;
    runner.log_startup("calculate");

    // CLI > config > defaults
    let mut settings = runner.config().calculator.clone();
    if let Some(binary) = args.binary {
        settings.binary = binary;
    }
    if let Some(sdf_dir) = args.sdf_dir {
        settings.sdf_dir = sdf_dir;
    }
    if let Some(rx_height) = args.rx_height {
        if !rx_height.is_finite() || rx_height < 0.0 {
            return Err(CliError::Config(
                "--rx-height must be a non-negative number".to_string(),
            ));
        }
        settings.rx_height = rx_height;
    }

    let sites = discover_sites(&args.sites);
    let rejected = args.sites.len() - sites.len();
    if sites.is_empty() {
        return Err(CliError::NothingProcessed {
            command: "calculate",
            failed: args.sites.len(),
        });
    }
    ensure_dir(&args.output)?;

    let calculator = SplatCalculator::new(settings);
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for site in &sites {
        if runner.cancel_token().is_cancelled() {
            break;
        }
        println!("Calculating {}...", site.name);

        match calculator.calculate(site, &args.output) {
            Ok(result) => {
                copy_site_colors(site, &result, &args.output);
                println!("  ✓ {}", result.raster.display());
                succeeded += 1;
            }
            Err(e) => {
                warn!(site = %site.name, error = %e, "Coverage calculation failed, skipping site");
                println!("  ✗ {}", e);
                failed += 1;
            }
        }
    }

    println!();
    println!("Calculate summary");
    println!("  Sites:     {}", sites.len());
    println!("  Succeeded: {}", succeeded);
    println!("  Failed:    {}", failed);
    if rejected > 0 {
        println!("  Skipped:   {} (not a .qth file or missing)", rejected);
    }
    if runner.cancel_token().is_cancelled() {
        println!("  Interrupted before all sites ran");
    }
    info!(succeeded, failed, rejected, "Calculate finished");

    if succeeded == 0 && failed > 0 {
        return Err(CliError::NothingProcessed {
            command: "calculate",
            failed,
        });
    }
    Ok(())
}

/// Copy the site's own signal colors next to its raster.
fn copy_site_colors(site: &TxSite, result: &CalculationResult, out_dir: &Path) {
    let Some(scf) = &site.scf else {
        return;
    };
    let target = out_dir.join(format!("{}.scf", result.site));
    if let Err(e) = std::fs::copy(scf, &target) {
        warn!(
            site = %site.name,
            scf = %scf.display(),
            error = %e,
            "Failed to copy signal colors"
        );
    }
}
