//! Zoom level selections.
//!
//! Users select zoom levels as a list of tokens, each either a single level
//! (`7`) or an inclusive range (`0-12`). The selection is normalized to a
//! sorted, deduplicated set.

use std::fmt;
use std::ops::RangeInclusive;

use thiserror::Error;

use crate::coord::MAX_ZOOM;

/// Zoom levels split by default.
pub const DEFAULT_SPLIT_ZOOMS: RangeInclusive<u8> = 0..=12;

/// Errors from parsing a zoom selection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZoomError {
    /// A token is neither `N` nor `A-B`.
    #[error("Invalid zoom token '{0}' (expected N or A-B)")]
    InvalidToken(String),

    /// A range whose start is above its end.
    #[error("Invalid zoom range '{0}': start is greater than end")]
    InvertedRange(String),

    /// A level above the supported maximum.
    #[error("Zoom level {0} exceeds maximum {MAX_ZOOM}")]
    TooDeep(u32),

    /// No levels were selected.
    #[error("Empty zoom selection")]
    Empty,

    /// A downsample target that is not coarser than the base zoom.
    #[error("Zoom level {level} must be below base zoom {base}")]
    NotBelowBase { level: u8, base: u8 },
}

/// A sorted, deduplicated set of zoom levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomLevels(Vec<u8>);

impl ZoomLevels {
    /// Parses a list of `N` / `A-B` tokens.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ZoomError> {
        let mut levels = Vec::new();

        for token in tokens {
            let token = token.as_ref().trim();
            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_level(start, token)?;
                    let end = parse_level(end, token)?;
                    if start > end {
                        return Err(ZoomError::InvertedRange(token.to_string()));
                    }
                    levels.extend(start..=end);
                }
                None => levels.push(parse_level(token, token)?),
            }
        }

        Self::from_levels(levels)
    }

    /// Builds a selection from explicit levels.
    pub fn from_levels(mut levels: Vec<u8>) -> Result<Self, ZoomError> {
        if let Some(&deepest) = levels.iter().max() {
            if deepest > MAX_ZOOM {
                return Err(ZoomError::TooDeep(deepest as u32));
            }
        }
        levels.sort_unstable();
        levels.dedup();
        if levels.is_empty() {
            return Err(ZoomError::Empty);
        }
        Ok(Self(levels))
    }

    /// Builds a selection covering an inclusive range.
    pub fn range(levels: RangeInclusive<u8>) -> Result<Self, ZoomError> {
        Self::from_levels(levels.collect())
    }

    /// Default split levels.
    pub fn default_split() -> Self {
        Self(DEFAULT_SPLIT_ZOOMS.collect())
    }

    /// Default downsample targets: every level below `base`.
    ///
    /// Returns [`ZoomError::Empty`] when `base` is 0.
    pub fn default_downsample(base: u8) -> Result<Self, ZoomError> {
        if base == 0 {
            return Err(ZoomError::Empty);
        }
        Self::range(0..=base - 1)
    }

    /// Checks that every level is strictly coarser than `base`.
    pub fn ensure_below(&self, base: u8) -> Result<(), ZoomError> {
        match self.0.iter().find(|&&level| level >= base) {
            Some(&level) => Err(ZoomError::NotBelowBase { level, base }),
            None => Ok(()),
        }
    }

    /// True if `zoom` is selected.
    pub fn contains(&self, zoom: u8) -> bool {
        self.0.binary_search(&zoom).is_ok()
    }

    /// The coarsest (smallest) selected level.
    pub fn min(&self) -> u8 {
        self.0[0]
    }

    /// The finest (largest) selected level.
    pub fn max(&self) -> u8 {
        self.0[self.0.len() - 1]
    }

    /// Levels in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    /// Levels as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of selected levels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; selections are never empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ZoomLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Collapse consecutive runs: 0-4,7,9-10
        let mut first = true;
        let mut i = 0;
        while i < self.0.len() {
            let start = self.0[i];
            let mut end = start;
            while i + 1 < self.0.len() && self.0[i + 1] == end + 1 {
                i += 1;
                end = self.0[i];
            }
            if !first {
                write!(f, ",")?;
            }
            first = false;
            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
            i += 1;
        }
        Ok(())
    }
}

fn parse_level(text: &str, token: &str) -> Result<u8, ZoomError> {
    let value: u32 = text
        .trim()
        .parse()
        .map_err(|_| ZoomError::InvalidToken(token.to_string()))?;
    if value > MAX_ZOOM as u32 {
        return Err(ZoomError::TooDeep(value));
    }
    Ok(value as u8)
}
