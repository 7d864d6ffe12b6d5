//! External RF coverage calculator.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use super::TxSite;
use crate::georef::sidecar_path;

/// Calculator binary used when none is configured.
pub const DEFAULT_CALCULATOR_BINARY: &str = "splat";

/// Terrain data directory used when none is configured.
pub const DEFAULT_SDF_DIR: &str = "./sdf";

/// Receiver antenna height above ground (metres) used when none is configured.
pub const DEFAULT_RX_HEIGHT: f64 = 10.0;

/// Errors from running the calculator for one site.
#[derive(Debug, Error)]
pub enum CalculatorError {
    /// The calculator process could not be started.
    #[error("Failed to run {binary} for site {site}: {source}")]
    Spawn {
        site: String,
        binary: String,
        source: std::io::Error,
    },

    /// The calculator exited unsuccessfully.
    #[error("{binary} failed for site {site} ({status}): {stderr}")]
    Failed {
        site: String,
        binary: String,
        status: String,
        stderr: String,
    },

    /// The calculator succeeded but its raster is missing.
    #[error("{binary} produced no raster for site {site}: expected {path}")]
    MissingOutput {
        site: String,
        binary: String,
        path: PathBuf,
    },

    /// The output directory could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Files produced for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationResult {
    /// Site name.
    pub site: String,
    /// Coverage raster.
    pub raster: PathBuf,
    /// Geo-reference sidecar of the raster.
    pub georef: PathBuf,
}

/// Computes the coverage raster of a transmitter site.
///
/// Implementations must be thread-safe so several sites can be computed at
/// once.
pub trait RfCalculator: Send + Sync {
    /// Computes coverage for `site`, writing `<out_dir>/<site>.ppm` and its
    /// `.geo` sidecar.
    fn calculate(
        &self,
        site: &TxSite,
        out_dir: &Path,
    ) -> Result<CalculationResult, CalculatorError>;

    /// Short name for logging.
    fn name(&self) -> &str;
}

/// Calculator process settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorSettings {
    /// Calculator executable.
    pub binary: String,
    /// Terrain (SDF) data directory.
    pub sdf_dir: PathBuf,
    /// Receiver height above ground in metres.
    pub rx_height: f64,
    /// Extra arguments appended to every invocation.
    pub extra_args: Vec<String>,
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_CALCULATOR_BINARY.to_string(),
            sdf_dir: PathBuf::from(DEFAULT_SDF_DIR),
            rx_height: DEFAULT_RX_HEIGHT,
            extra_args: Vec::new(),
        }
    }
}

/// Runs the SPLAT! command-line calculator.
#[derive(Debug, Clone)]
pub struct SplatCalculator {
    settings: CalculatorSettings,
}

impl SplatCalculator {
    /// Creates a calculator with the given settings.
    pub fn new(settings: CalculatorSettings) -> Self {
        Self { settings }
    }

    /// The calculator's settings.
    pub fn settings(&self) -> &CalculatorSettings {
        &self.settings
    }

    /// Arguments passed to the calculator for one site.
    pub fn arguments(&self, site: &TxSite, raster: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-t".into(),
            site.qth.clone().into_os_string(),
            "-L".into(),
            self.settings.rx_height.to_string().into(),
            "-d".into(),
            self.settings.sdf_dir.clone().into_os_string(),
            "-ngs".into(),
            "-geo".into(),
            "-o".into(),
            raster.as_os_str().to_os_string(),
        ];
        args.extend(self.settings.extra_args.iter().map(OsString::from));
        args
    }
}

impl RfCalculator for SplatCalculator {
    fn calculate(
        &self,
        site: &TxSite,
        out_dir: &Path,
    ) -> Result<CalculationResult, CalculatorError> {
        std::fs::create_dir_all(out_dir).map_err(|source| CalculatorError::OutputDir {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let raster = out_dir.join(format!("{}.ppm", site.name));
        let args = self.arguments(site, &raster);
        let binary = &self.settings.binary;

        info!(site = %site.name, binary = %binary, "Running calculator");
        debug!(site = %site.name, args = ?args, "Calculator arguments");

        let output = Command::new(binary)
            .args(&args)
            .output()
            .map_err(|source| CalculatorError::Spawn {
                site: site.name.clone(),
                binary: binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CalculatorError::Failed {
                site: site.name.clone(),
                binary: binary.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !raster.is_file() {
            return Err(CalculatorError::MissingOutput {
                site: site.name.clone(),
                binary: binary.clone(),
                path: raster,
            });
        }

        Ok(CalculationResult {
            site: site.name.clone(),
            georef: sidecar_path(&raster),
            raster,
        })
    }

    fn name(&self) -> &str {
        "splat"
    }
}
