//! Coordinate conversion module
//!
//! Conversions between geographic coordinates (latitude/longitude), Web
//! Mercator slippy-map tile indices, and pixel offsets inside a georeferenced
//! source raster.

mod types;

pub use types::{
    CoordError, TileAddress, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

use crate::georef::GeoReference;

/// Converts a (possibly fractional) tile position to geographic coordinates.
///
/// Integer positions give the tile's northwest corner; `x + 0.5, y + 0.5`
/// gives its centre.
///
/// # Returns
///
/// `(lat, lon)` in degrees.
#[inline]
pub fn tile_to_lat_lon(x: f64, y: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);

    let lon = x / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    let lat = lat_rad.to_degrees();

    (lat, lon)
}

/// Converts geographic coordinates to a fractional tile position.
///
/// No validation; callers needing tile indices should use [`lat_lon_to_tile`].
#[inline]
pub fn lat_lon_to_tile_position(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);

    let x = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    (x, y)
}

/// Converts geographic coordinates to the index of the tile containing them.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees ([`MIN_LAT`] to [`MAX_LAT`])
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to [`MAX_ZOOM`])
///
/// # Returns
///
/// `(x, y)` tile indices. Points on the eastern or southern edge of the world
/// map to the last column or row.
#[inline]
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> Result<(u32, u32), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let last = (1u64 << zoom) - 1;
    let (x, y) = lat_lon_to_tile_position(lat, lon, zoom);
    let clamp = |v: f64| (v.floor().max(0.0) as u64).min(last) as u32;

    Ok((clamp(x), clamp(y)))
}

/// Maps geographic coordinates to continuous pixel coordinates in a raster.
///
/// The raster is an equirectangular grid: its bounding box spans `width`
/// pixels of longitude and `height` pixels of latitude, origin at the
/// north-west corner. The result is not rounded; callers sample with
/// `floor` so adjacent tiles agree on every boundary pixel.
#[inline]
pub fn pixel_for_lat_lon(georef: &GeoReference, lat: f64, lon: f64) -> (f64, f64) {
    let px = (lon - georef.west()) / georef.lon_per_pixel();
    let py = (georef.north() - lat) / georef.lat_per_pixel();
    (px, py)
}
