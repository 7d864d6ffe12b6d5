//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::downsample::ShrinkFilter;
use crate::executor::{default_workers, DEFAULT_QUEUE_FACTOR};
use crate::priority::{PriorityError, PriorityTable};
use crate::site::CalculatorSettings;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Worker pool settings
    pub general: GeneralSettings,
    /// Tile output settings
    pub tiles: TileSettings,
    /// Compositing priority settings
    pub priority: PrioritySettings,
    /// Downsampling settings
    pub downsample: DownsampleSettings,
    /// External calculator settings
    pub calculator: CalculatorSettings,
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    /// Worker threads
    pub workers: usize,
    /// Backlog slots per worker
    pub queue_factor: usize,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_factor: DEFAULT_QUEUE_FACTOR,
        }
    }
}

/// Tile output configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileSettings {
    /// Write tiles that carry no coverage
    pub blank_tiles: bool,
}

/// Priority table configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrioritySettings {
    /// Signal color file; the built-in table is used when unset
    pub file: Option<PathBuf>,
}

impl PrioritySettings {
    /// Loads the configured table, or the built-in one.
    pub fn table(&self) -> Result<PriorityTable, PriorityError> {
        match &self.file {
            Some(path) => PriorityTable::from_file(path),
            None => Ok(PriorityTable::default()),
        }
    }
}

/// Downsampling configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownsampleSettings {
    /// 2× shrink filter
    pub filter: ShrinkFilter,
}
