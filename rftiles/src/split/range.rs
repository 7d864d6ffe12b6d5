//! Tile ranges covering a raster's bounding box.

use std::ops::RangeInclusive;

use crate::coord::{
    lat_lon_to_tile_position, TileAddress, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
};
use crate::georef::GeoReference;

/// Tolerance, in tile units, for bounding-box edges that fall on a tile edge.
const EDGE_EPSILON: f64 = 1e-9;

/// Rectangle of tiles at one zoom level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRange {
    /// Zoom level
    pub zoom: u8,
    /// Columns, inclusive
    pub x: RangeInclusive<u32>,
    /// Rows, inclusive
    pub y: RangeInclusive<u32>,
}

impl TileRange {
    /// Computes the tiles intersecting the raster's bounding box.
    ///
    /// Returns `None` when the box lies entirely outside the Web Mercator
    /// latitude band, or when `zoom` exceeds [`MAX_ZOOM`].
    pub fn covering(georef: &GeoReference, zoom: u8) -> Option<Self> {
        if zoom > MAX_ZOOM {
            return None;
        }

        let north = georef.north().min(MAX_LAT);
        let south = georef.south().max(MIN_LAT);
        let west = georef.west().max(MIN_LON);
        let east = georef.east().min(MAX_LON);
        if north <= south || east <= west {
            return None;
        }

        let (x_start, y_start) = lat_lon_to_tile_position(north, west, zoom);
        let (x_end, y_end) = lat_lon_to_tile_position(south, east, zoom);

        let last = ((1u64 << zoom) - 1) as i64;
        let first_index = |v: f64| ((v + EDGE_EPSILON).floor() as i64).clamp(0, last);
        // A south-east edge exactly on a tile edge does not pull in the next tile
        let last_index = |v: f64| ((v - EDGE_EPSILON).ceil() as i64 - 1).clamp(0, last);

        let x0 = first_index(x_start);
        let y0 = first_index(y_start);
        let x1 = last_index(x_end).max(x0);
        let y1 = last_index(y_end).max(y0);

        Some(Self {
            zoom,
            x: x0 as u32..=x1 as u32,
            y: y0 as u32..=y1 as u32,
        })
    }

    /// Number of tiles in the range.
    pub fn len(&self) -> u64 {
        let width = (*self.x.end() - *self.x.start()) as u64 + 1;
        let height = (*self.y.end() - *self.y.start()) as u64 + 1;
        width * height
    }

    /// Always false; a range holds at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Tile addresses in column-major order.
    pub fn addresses(&self) -> impl Iterator<Item = TileAddress> + '_ {
        self.x.clone().flat_map(move |x| {
            self.y
                .clone()
                .map(move |y| TileAddress::new(self.zoom, x, y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::tile_to_lat_lon;

    fn georef_for_tile(zoom: u8, x: u32, y: u32) -> GeoReference {
        let (north, west) = tile_to_lat_lon(x as f64, y as f64, zoom);
        let (south, east) = tile_to_lat_lon(x as f64 + 1.0, y as f64 + 1.0, zoom);
        GeoReference::new(north, south, west, east, 512, 512).unwrap()
    }

    #[test]
    fn test_exact_tile_yields_one_tile() {
        let georef = georef_for_tile(10, 545, 361);
        let range = TileRange::covering(&georef, 10).unwrap();
        assert_eq!(range.x, 545..=545);
        assert_eq!(range.y, 361..=361);
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn test_exact_tile_at_finer_zoom() {
        let georef = georef_for_tile(10, 545, 361);
        let range = TileRange::covering(&georef, 11).unwrap();
        assert_eq!(range.x, 1090..=1091);
        assert_eq!(range.y, 722..=723);
        assert_eq!(range.addresses().count(), 4);
    }

    #[test]
    fn test_exact_tile_at_coarser_zoom() {
        let georef = georef_for_tile(10, 545, 361);
        let range = TileRange::covering(&georef, 9).unwrap();
        assert_eq!(range.x, 272..=272);
        assert_eq!(range.y, 180..=180);
    }

    #[test]
    fn test_zoom_beyond_max_is_none() {
        let georef = georef_for_tile(10, 545, 361);
        assert!(TileRange::covering(&georef, MAX_ZOOM).is_some());
        assert_eq!(TileRange::covering(&georef, MAX_ZOOM + 1), None);
        assert_eq!(TileRange::covering(&georef, 64), None);
        assert_eq!(TileRange::covering(&georef, u8::MAX), None);
    }

    #[test]
    fn test_zoom_zero_is_single_tile() {
        let georef = GeoReference::new(50.0, 49.0, -10.0, -9.0, 100, 100).unwrap();
        let range = TileRange::covering(&georef, 0).unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range.addresses().next(), Some(TileAddress::new(0, 0, 0)));
    }

    #[test]
    fn test_polar_box_is_clamped() {
        let georef = GeoReference::new(89.0, 80.0, 0.0, 1.0, 100, 100).unwrap();
        let range = TileRange::covering(&georef, 4).unwrap();
        assert_eq!(*range.y.start(), 0);
    }

    #[test]
    fn test_box_outside_mercator_band() {
        let georef = GeoReference::new(89.9, 86.0, 0.0, 1.0, 100, 100).unwrap();
        assert!(TileRange::covering(&georef, 4).is_none());
    }
}
