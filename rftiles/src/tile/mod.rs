//! Tile images and their on-disk layout.
//!
//! Every tile is a 256×256 RGBA image. Pixels outside any coverage carry the
//! transparent sentinel `(255, 255, 255, 0)`, which the compositor treats as
//! "no data". Tiles are persisted as PNG under `<root>/<zoom>/<x>/<y>.png`.

mod store;

pub use store::{copy_tile, load_tile, save_tile, TileIoError, PARTIAL_SUFFIX};

use image::{Rgba, RgbaImage};

/// Width and height of a tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// File extension of persisted tiles.
pub const TILE_EXTENSION: &str = "png";

/// Transparent sentinel pixel.
pub const TRANSPARENT: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Returns true if the pixel is exactly the transparent sentinel.
#[inline]
pub fn is_transparent(pixel: &Rgba<u8>) -> bool {
    *pixel == TRANSPARENT
}

/// Creates a tile filled with the transparent sentinel.
pub fn blank_tile() -> RgbaImage {
    RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, TRANSPARENT)
}

/// Returns true if the image carries no coverage.
///
/// A tile is blank when every pixel is white, whatever its alpha. This
/// covers both fully transparent tiles and tiles of solid white.
pub fn is_blank(image: &RgbaImage) -> bool {
    image.pixels().all(|p| p.0[..3] == [255, 255, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_tile_dimensions() {
        let tile = blank_tile();
        assert_eq!(tile.dimensions(), (TILE_SIZE, TILE_SIZE));
        assert!(tile.pixels().all(is_transparent));
    }

    #[test]
    fn test_blank_detection() {
        let mut tile = blank_tile();
        assert!(is_blank(&tile));

        tile.put_pixel(10, 10, Rgba([255, 255, 255, 255]));
        assert!(is_blank(&tile), "opaque white is still blank");

        tile.put_pixel(11, 10, Rgba([255, 0, 0, 255]));
        assert!(!is_blank(&tile));
    }

    #[test]
    fn test_is_transparent_requires_exact_sentinel() {
        assert!(is_transparent(&Rgba([255, 255, 255, 0])));
        assert!(!is_transparent(&Rgba([0, 0, 0, 0])));
        assert!(!is_transparent(&Rgba([255, 255, 255, 255])));
    }
}
