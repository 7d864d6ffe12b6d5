//! Transmitter sites and coverage calculation.
//!
//! A site is defined by a `.qth` file (name, position and antenna height).
//! Optional sidecars with the same stem refine it:
//!
//! | Extension | Contents                      |
//! |-----------|-------------------------------|
//! | `.lrp`    | terrain and radio parameters  |
//! | `.az`     | antenna azimuth pattern       |
//! | `.el`     | antenna elevation pattern     |
//! | `.scf`    | signal level colors           |
//!
//! [`discover_sites`] turns a list of user inputs into sites, skipping
//! anything that is not an existing `.qth` file. Each site is then handed to
//! an [`RfCalculator`] that produces the coverage raster and its `.geo`.

mod calculator;

pub use calculator::{
    CalculationResult, CalculatorError, CalculatorSettings, RfCalculator, SplatCalculator,
    DEFAULT_CALCULATOR_BINARY, DEFAULT_RX_HEIGHT, DEFAULT_SDF_DIR,
};

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Extension of site definition files.
pub const QTH_EXTENSION: &str = "qth";

/// Errors from loading a site definition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SiteError {
    /// The input does not end in `.qth`.
    #[error("Site file doesn't end with .qth: {0}")]
    NotQth(PathBuf),

    /// The input does not exist or is not a file.
    #[error("Invalid site file: {0}")]
    NotFound(PathBuf),

    /// The file name has no usable stem.
    #[error("Site file has no name: {0}")]
    Unnamed(PathBuf),
}

/// One transmitter site and its optional sidecars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSite {
    /// Site name (the `.qth` stem).
    pub name: String,
    /// Site definition.
    pub qth: PathBuf,
    /// Terrain and radio parameters.
    pub lrp: Option<PathBuf>,
    /// Antenna azimuth pattern.
    pub az: Option<PathBuf>,
    /// Antenna elevation pattern.
    pub el: Option<PathBuf>,
    /// Signal level colors.
    pub scf: Option<PathBuf>,
}

impl TxSite {
    /// Loads a site from its `.qth` file, picking up existing sidecars.
    pub fn from_qth(path: &Path) -> Result<Self, SiteError> {
        if !path.extension().is_some_and(|e| e == QTH_EXTENSION) {
            return Err(SiteError::NotQth(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(SiteError::NotFound(path.to_path_buf()));
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SiteError::Unnamed(path.to_path_buf()))?
            .to_string();

        let sidecar = |ext: &str| {
            let candidate = path.with_extension(ext);
            candidate.is_file().then_some(candidate)
        };

        Ok(Self {
            name,
            qth: path.to_path_buf(),
            lrp: sidecar("lrp"),
            az: sidecar("az"),
            el: sidecar("el"),
            scf: sidecar("scf"),
        })
    }
}

impl fmt::Display for TxSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[qth=\"{}\"", self.name, self.qth.display())?;
        let optional = [
            ("lrp", &self.lrp),
            ("az", &self.az),
            ("el", &self.el),
            ("scf", &self.scf),
        ];
        for (label, path) in optional {
            if let Some(path) = path {
                write!(f, ", {}=\"{}\"", label, path.display())?;
            }
        }
        write!(f, "]")
    }
}

/// Loads every valid site from `inputs`.
///
/// Invalid inputs are logged and skipped; the remaining sites are returned
/// in input order.
pub fn discover_sites<P: AsRef<Path>>(inputs: &[P]) -> Vec<TxSite> {
    inputs
        .iter()
        .filter_map(|input| {
            let input = input.as_ref();
            debug!(input = %input.display(), "Evaluating site file");
            match TxSite::from_qth(input) {
                Ok(site) => {
                    info!(site = %site, "Added transmitter site");
                    Some(site)
                }
                Err(e) => {
                    warn!(error = %e, "Skipping site");
                    None
                }
            }
        })
        .collect()
}
