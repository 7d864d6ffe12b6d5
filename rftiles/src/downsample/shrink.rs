//! Quad assembly and 2× shrinking.

use std::fmt;
use std::str::FromStr;

use image::imageops;
use image::{Rgba, RgbaImage};

use crate::tile::TILE_SIZE;

/// How a 512×512 quad canvas is reduced to one 256×256 tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShrinkFilter {
    /// Top-left pixel of each 2×2 block. Keeps every output color inside
    /// the input palette, so priority colors survive downsampling.
    #[default]
    Nearest,
    /// Channel-wise average of each 2×2 block.
    Box,
}

impl ShrinkFilter {
    /// Name used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShrinkFilter::Nearest => "nearest",
            ShrinkFilter::Box => "box",
        }
    }
}

impl fmt::Display for ShrinkFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShrinkFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(ShrinkFilter::Nearest),
            "box" => Ok(ShrinkFilter::Box),
            other => Err(format!(
                "unknown filter '{}' (expected nearest or box)",
                other
            )),
        }
    }
}

/// Pastes four tiles into a 2×2 canvas in TL, TR, BL, BR order.
pub fn assemble(quadrants: [&RgbaImage; 4]) -> RgbaImage {
    let mut canvas = RgbaImage::new(TILE_SIZE * 2, TILE_SIZE * 2);
    let offsets = [
        (0, 0),
        (TILE_SIZE, 0),
        (0, TILE_SIZE),
        (TILE_SIZE, TILE_SIZE),
    ];
    for (tile, (x, y)) in quadrants.into_iter().zip(offsets) {
        imageops::replace(&mut canvas, tile, x as i64, y as i64);
    }
    canvas
}

/// Halves a canvas in both dimensions.
pub fn shrink(canvas: &RgbaImage, filter: ShrinkFilter) -> RgbaImage {
    let width = canvas.width() / 2;
    let height = canvas.height() / 2;

    match filter {
        ShrinkFilter::Nearest => {
            RgbaImage::from_fn(width, height, |x, y| *canvas.get_pixel(x * 2, y * 2))
        }
        ShrinkFilter::Box => RgbaImage::from_fn(width, height, |x, y| {
            let block = [
                canvas.get_pixel(x * 2, y * 2),
                canvas.get_pixel(x * 2 + 1, y * 2),
                canvas.get_pixel(x * 2, y * 2 + 1),
                canvas.get_pixel(x * 2 + 1, y * 2 + 1),
            ];
            let mut out = [0u8; 4];
            for (channel, value) in out.iter_mut().enumerate() {
                let sum: u16 = block.iter().map(|p| p.0[channel] as u16).sum();
                *value = ((sum + 2) / 4) as u8;
            }
            Rgba(out)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{blank_tile, TRANSPARENT};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 208, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn test_filter_parsing() {
        assert_eq!("nearest".parse::<ShrinkFilter>(), Ok(ShrinkFilter::Nearest));
        assert_eq!(" BOX ".parse::<ShrinkFilter>(), Ok(ShrinkFilter::Box));
        assert!("lanczos".parse::<ShrinkFilter>().is_err());
        assert_eq!(ShrinkFilter::default(), ShrinkFilter::Nearest);
        assert_eq!(ShrinkFilter::Box.to_string(), "box");
    }

    #[test]
    fn test_assemble_quadrant_order() {
        let tl = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, RED);
        let tr = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, GREEN);
        let bl = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, BLUE);
        let br = blank_tile();

        let canvas = assemble([&tl, &tr, &bl, &br]);
        assert_eq!(canvas.dimensions(), (512, 512));
        assert_eq!(canvas.get_pixel(10, 10), &RED);
        assert_eq!(canvas.get_pixel(300, 10), &GREEN);
        assert_eq!(canvas.get_pixel(10, 300), &BLUE);
        assert_eq!(canvas.get_pixel(300, 300), &TRANSPARENT);
    }

    #[test]
    fn test_nearest_takes_top_left_of_block() {
        let mut canvas = RgbaImage::from_pixel(4, 4, GREEN);
        canvas.put_pixel(0, 0, RED);
        canvas.put_pixel(1, 1, BLUE);

        let out = shrink(&canvas, ShrinkFilter::Nearest);
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get_pixel(0, 0), &RED);
        assert_eq!(out.get_pixel(1, 1), &GREEN);
    }

    #[test]
    fn test_box_averages_block() {
        let mut canvas = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        canvas.put_pixel(0, 0, Rgba([200, 100, 40, 255]));
        canvas.put_pixel(1, 0, Rgba([200, 100, 40, 255]));

        let out = shrink(&canvas, ShrinkFilter::Box);
        assert_eq!(out.get_pixel(0, 0), &Rgba([100, 50, 20, 255]));
    }

    #[test]
    fn test_shrunk_quad_is_tile_sized() {
        let tiles = [blank_tile(), blank_tile(), blank_tile(), blank_tile()];
        let canvas = assemble([&tiles[0], &tiles[1], &tiles[2], &tiles[3]]);
        let out = shrink(&canvas, ShrinkFilter::Nearest);
        assert_eq!(out.dimensions(), (TILE_SIZE, TILE_SIZE));
    }
}
