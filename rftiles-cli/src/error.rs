//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use rftiles::config::ConfigFileError;
use rftiles::downsample::DownsampleError;
use rftiles::merge::MergeError;
use rftiles::priority::PriorityError;
use rftiles::split::SplitError;
use rftiles::zoom::ZoomError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to load the config file
    ConfigFile(ConfigFileError),
    /// Failed to load the signal color file
    Priority(PriorityError),
    /// Invalid zoom selection
    Zoom(ZoomError),
    /// Failed to install the Ctrl-C handler
    SignalHandler(String),
    /// Failed to create an output directory
    OutputDir { path: PathBuf, error: std::io::Error },
    /// Splitter could not be set up
    Split(SplitError),
    /// Merge could not run
    Merge(MergeError),
    /// Downsampling could not run
    Downsample(DownsampleError),
    /// Every input of a batch failed
    NothingProcessed { command: &'static str, failed: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::ConfigFile(_) => {
                eprintln!();
                eprintln!("Run 'rftiles config' to print a valid configuration,");
                eprintln!("or pass --config <path> to use a different file.");
            }
            CliError::Downsample(DownsampleError::BaseZoom { .. }) => {
                eprintln!();
                eprintln!("The base zoom directory must exist and hold <x>/<y>.png tiles.");
                eprintln!("Run 'rftiles split' or 'rftiles merge' first.");
            }
            CliError::NothingProcessed {
                command: "calculate",
                ..
            } => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Calculator not installed: check [calculator] binary in config.ini");
                eprintln!("  2. Terrain files missing: check [calculator] sdf_dir");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Priority(e) => write!(f, "Failed to load signal colors: {}", e),
            CliError::Zoom(e) => write!(f, "Invalid zoom levels: {}", e),
            CliError::SignalHandler(msg) => {
                write!(f, "Failed to install Ctrl-C handler: {}", msg)
            }
            CliError::OutputDir { path, error } => {
                write!(
                    f,
                    "Failed to create output directory '{}': {}",
                    path.display(),
                    error
                )
            }
            CliError::Split(e) => write!(f, "Split failed: {}", e),
            CliError::Merge(e) => write!(f, "Merge failed: {}", e),
            CliError::Downsample(e) => write!(f, "Downsample failed: {}", e),
            CliError::NothingProcessed { command, failed } => {
                write!(f, "{}: all {} input(s) failed", command, failed)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Priority(e) => Some(e),
            CliError::Zoom(e) => Some(e),
            CliError::OutputDir { error, .. } => Some(error),
            CliError::Split(e) => Some(e),
            CliError::Merge(e) => Some(e),
            CliError::Downsample(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<PriorityError> for CliError {
    fn from(e: PriorityError) -> Self {
        CliError::Priority(e)
    }
}

impl From<ZoomError> for CliError {
    fn from(e: ZoomError) -> Self {
        CliError::Zoom(e)
    }
}

impl From<SplitError> for CliError {
    fn from(e: SplitError) -> Self {
        CliError::Split(e)
    }
}

impl From<MergeError> for CliError {
    fn from(e: MergeError) -> Self {
        CliError::Merge(e)
    }
}

impl From<DownsampleError> for CliError {
    fn from(e: DownsampleError) -> Self {
        CliError::Downsample(e)
    }
}
