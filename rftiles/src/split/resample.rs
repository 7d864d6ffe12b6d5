//! Nearest-neighbor resampling of one tile out of a source raster.

use image::{Rgba, RgbaImage};

use crate::coord::{pixel_for_lat_lon, tile_to_lat_lon, TileAddress};
use crate::georef::GeoReference;
use crate::tile::{blank_tile, TILE_SIZE, TRANSPARENT};

/// Renders the tile at `address` from `raster`.
///
/// Every output pixel samples the source pixel under its centre. Rows are
/// projected through the exact Mercator latitude of the row centre, so tiles
/// at high zoom stay aligned with the raster grid. Samples outside the raster
/// and pure white or black source pixels become [`TRANSPARENT`].
///
/// A tile whose pixel rectangle is empty, inverted or non-finite comes back
/// fully transparent.
pub fn render_tile(raster: &RgbaImage, georef: &GeoReference, address: TileAddress) -> RgbaImage {
    let zoom = address.zoom;
    let (x, y) = (address.x as f64, address.y as f64);

    let (north, west) = tile_to_lat_lon(x, y, zoom);
    let (south, east) = tile_to_lat_lon(x + 1.0, y + 1.0, zoom);
    let (px_start, py_start) = pixel_for_lat_lon(georef, north, west);
    let (px_end, py_end) = pixel_for_lat_lon(georef, south, east);

    let finite = [px_start, py_start, px_end, py_end]
        .iter()
        .all(|v| v.is_finite());
    if !finite || px_end <= px_start || py_end <= py_start {
        return blank_tile();
    }

    let size = TILE_SIZE as f64;
    let (width, height) = raster.dimensions();

    // Longitude is linear in x, so columns are resolved once
    let columns: Vec<Option<u32>> = (0..TILE_SIZE)
        .map(|i| {
            let lon = west + (i as f64 + 0.5) / size * (east - west);
            let (px, _) = pixel_for_lat_lon(georef, north, lon);
            source_index(px, width)
        })
        .collect();

    let mut tile = RgbaImage::new(TILE_SIZE, TILE_SIZE);
    for j in 0..TILE_SIZE {
        let (lat, _) = tile_to_lat_lon(x, y + (j as f64 + 0.5) / size, zoom);
        let (_, py) = pixel_for_lat_lon(georef, lat, west);
        let row = source_index(py, height);

        for (i, column) in columns.iter().enumerate() {
            let pixel = match (column, row) {
                (Some(sx), Some(sy)) => keyed(*raster.get_pixel(*sx, sy)),
                _ => TRANSPARENT,
            };
            tile.put_pixel(i as u32, j, pixel);
        }
    }

    tile
}

fn source_index(coordinate: f64, extent: u32) -> Option<u32> {
    let index = coordinate.floor();
    if index >= 0.0 && index < extent as f64 {
        Some(index as u32)
    } else {
        None
    }
}

/// Applies color-keyed transparency to a source pixel.
fn keyed(pixel: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    if a == 0 || [r, g, b] == [255, 255, 255] || [r, g, b] == [0, 0, 0] {
        TRANSPARENT
    } else {
        Rgba([r, g, b, 255])
    }
}
