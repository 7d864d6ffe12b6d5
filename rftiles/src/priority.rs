//! Signal-priority table.
//!
//! Coverage maps color each pixel by signal band. When two transmitter
//! coverages overlap, the compositor keeps the color of the stronger band.
//! The table defines that order: index 0 is the strongest band and wins over
//! every other entry.
//!
//! The table is read from a signal color file (`.scf`):
//!
//! ```text
//! ; LEVEL: R, G, B
//! 128: 255, 0, 0
//! 118: 255, 165, 0
//! ```
//!
//! Lines starting with `;` are comments. Malformed lines are logged and
//! skipped.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::Rgba;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// An RGB color.
pub type Rgb = [u8; 3];

/// Built-in signal levels (dBµV/m) and colors, used when no `.scf` is given.
pub const DEFAULT_SIGNAL_COLORS: [(i32, Rgb); 13] = [
    (128, [255, 0, 0]),
    (118, [255, 165, 0]),
    (108, [255, 206, 0]),
    (98, [255, 255, 0]),
    (88, [184, 255, 0]),
    (78, [0, 255, 0]),
    (68, [0, 208, 0]),
    (58, [0, 196, 196]),
    (48, [0, 148, 255]),
    (38, [80, 80, 255]),
    (28, [0, 38, 255]),
    (18, [142, 63, 255]),
    (8, [140, 0, 128]),
];

/// Errors from loading a priority table.
#[derive(Debug, Error)]
pub enum PriorityError {
    /// The signal color file could not be read.
    #[error("Failed to read signal color file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn entry_regex() -> &'static Regex {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    ENTRY.get_or_init(|| {
        Regex::new(r"^\s*(-?[0-9]+)\s*:\s*([0-9]+)\s*,\s*([0-9]+)\s*,\s*([0-9]+)\s*$")
            .expect("signal color regex is valid")
    })
}

/// Ordered color table defining compositing priority.
///
/// Lookups go through a color→rank map built once at construction. When a
/// color appears more than once, its first (strongest) position is used.
#[derive(Debug, Clone)]
pub struct PriorityTable {
    colors: Vec<Rgb>,
    ranks: HashMap<Rgb, usize>,
}

impl PriorityTable {
    /// Builds a table from colors already in priority order.
    pub fn from_colors(colors: Vec<Rgb>) -> Self {
        let mut ranks = HashMap::with_capacity(colors.len());
        for (rank, color) in colors.iter().enumerate() {
            ranks.entry(*color).or_insert(rank);
        }
        Self { colors, ranks }
    }

    /// Builds a table from a signal-level→color mapping.
    ///
    /// Stronger signal levels get higher priority.
    pub fn from_signal_levels(levels: &BTreeMap<i32, Rgb>) -> Self {
        let colors = levels.iter().rev().map(|(_, color)| *color).collect();
        Self::from_colors(colors)
    }

    /// Parses signal color file content.
    ///
    /// Never fails: malformed lines are reported and skipped, and an input
    /// without a single valid entry yields the built-in table.
    pub fn parse(content: &str) -> Self {
        let levels = parse_signal_levels(content);
        if levels.is_empty() {
            warn!("Signal color file has no valid entries, using built-in table");
            return Self::default();
        }
        Self::from_signal_levels(&levels)
    }

    /// Reads and parses a signal color file.
    pub fn from_file(path: &Path) -> Result<Self, PriorityError> {
        let content = std::fs::read_to_string(path).map_err(|source| PriorityError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Parsing signal color file");
        Ok(Self::parse(&content))
    }

    /// Rank of an RGB color, lower is stronger.
    pub fn rank_of(&self, color: Rgb) -> Option<usize> {
        self.ranks.get(&color).copied()
    }

    /// Rank of a pixel. Only fully opaque pixels can be in the table.
    #[inline]
    pub fn rank(&self, pixel: &Rgba<u8>) -> Option<usize> {
        let [r, g, b, a] = pixel.0;
        if a != u8::MAX {
            return None;
        }
        self.ranks.get(&[r, g, b]).copied()
    }

    /// Colors in priority order.
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        let levels: BTreeMap<i32, Rgb> = DEFAULT_SIGNAL_COLORS.iter().copied().collect();
        Self::from_signal_levels(&levels)
    }
}

/// Parses `LEVEL: R, G, B` lines into a level→color map.
///
/// A later line for the same level replaces the earlier one.
pub fn parse_signal_levels(content: &str) -> BTreeMap<i32, Rgb> {
    let mut levels = BTreeMap::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if line.starts_with(';') || line.trim().is_empty() {
            continue;
        }

        match parse_entry(line) {
            Some((level, color)) => {
                levels.insert(level, color);
            }
            None => {
                warn!(line = line_no, content = line, "Unexpected line in signal color file");
            }
        }
    }

    levels
}

fn parse_entry(line: &str) -> Option<(i32, Rgb)> {
    let caps = entry_regex().captures(line)?;
    let level = caps[1].parse::<i32>().ok()?;
    let r = caps[2].parse::<u8>().ok()?;
    let g = caps[3].parse::<u8>().ok()?;
    let b = caps[4].parse::<u8>().ok()?;
    Some((level, [r, g, b]))
}
