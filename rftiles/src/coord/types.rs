//! Coordinate types shared by the splitter, merger and downsampler.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Maximum latitude representable in Web Mercator (degrees).
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator (degrees).
pub const MIN_LAT: f64 = -85.05112878;

/// Minimum longitude (degrees).
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude (degrees).
pub const MAX_LON: f64 = 180.0;

/// Minimum zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level.
///
/// Tile indices at this zoom still fit comfortably in a `u32`.
pub const MAX_ZOOM: u8 = 24;

/// Errors from coordinate conversion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range.
    #[error("Invalid latitude: {0} (must be between {MIN_LAT} and {MAX_LAT})")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0} (must be between {MIN_LON} and {MAX_LON})")]
    InvalidLongitude(f64),

    /// Zoom above [`MAX_ZOOM`].
    #[error("Invalid zoom level: {0} (must be between {MIN_ZOOM} and {MAX_ZOOM})")]
    InvalidZoom(u8),
}

/// Address of one slippy-map tile.
///
/// `x` grows eastwards and `y` grows southwards, both in `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    /// Zoom level
    pub zoom: u8,
    /// Column index
    pub x: u32,
    /// Row index
    pub y: u32,
}

impl TileAddress {
    /// Creates a tile address without validation.
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Number of tiles along one axis at this zoom.
    pub fn tiles_per_axis(&self) -> u64 {
        1u64 << self.zoom
    }

    /// Returns true if the indices are inside the grid for this zoom.
    pub fn is_valid(&self) -> bool {
        self.zoom <= MAX_ZOOM
            && u64::from(self.x) < self.tiles_per_axis()
            && u64::from(self.y) < self.tiles_per_axis()
    }

    /// The four tiles at `zoom + 1` covering this tile.
    ///
    /// Order is top-left, top-right, bottom-left, bottom-right.
    pub fn children(&self) -> [TileAddress; 4] {
        let zoom = self.zoom + 1;
        let (x, y) = (self.x * 2, self.y * 2);
        [
            TileAddress::new(zoom, x, y),
            TileAddress::new(zoom, x + 1, y),
            TileAddress::new(zoom, x, y + 1),
            TileAddress::new(zoom, x + 1, y + 1),
        ]
    }

    /// The tile at `zoom - 1` containing this tile, or `None` at zoom 0.
    pub fn parent(&self) -> Option<TileAddress> {
        if self.zoom == 0 {
            return None;
        }
        Some(TileAddress::new(self.zoom - 1, self.x / 2, self.y / 2))
    }

    /// Directory holding this tile: `<root>/<zoom>/<x>`.
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(self.zoom.to_string()).join(self.x.to_string())
    }

    /// Full tile path: `<root>/<zoom>/<x>/<y>.<ext>`.
    pub fn path(&self, root: &Path, ext: &str) -> PathBuf {
        self.dir(root).join(format!("{}.{}", self.y, ext))
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}
