//! User configuration.
//!
//! Settings come from three layers, highest precedence first:
//!
//! 1. Command-line flags
//! 2. `~/.rftiles/config.ini`
//! 3. Built-in defaults
//!
//! This module owns layers 2 and 3; the CLI applies its flags on top of the
//! loaded [`ConfigFile`].
//!
//! # Example
//!
//! ```
//! use rftiles::config::ConfigFile;
//! use rftiles::downsample::ShrinkFilter;
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.downsample.filter, ShrinkFilter::Nearest);
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, DownsampleSettings, GeneralSettings, PrioritySettings, TileSettings};
