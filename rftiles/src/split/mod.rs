//! Raster to tile pyramid splitting.
//!
//! A [`TileSplitter`] cuts one georeferenced coverage raster into 256×256
//! slippy-map tiles for each requested zoom level and writes them to
//! `<out>/<zoom>/<x>/<y>.png`.
//!
//! # Pipeline
//!
//! ```text
//! raster + .geo ──► TileRange::covering(zoom)
//!                          │
//!                          ▼  (rayon, per tile)
//!                   render_tile() ──► blank? ──yes──► skip
//!                                       │no
//!                                       ▼
//!                                  save_tile()
//! ```
//!
//! Tiles of one zoom are rendered in parallel on a dedicated rayon pool.
//! Zoom levels are processed one after another.

mod range;
mod resample;

pub use range::TileRange;
pub use resample::render_tile;

use std::path::{Path, PathBuf};

use image::RgbaImage;
use rayon::prelude::*;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::TileAddress;
use crate::executor::default_workers;
use crate::georef::{sidecar_path, GeoRefError, GeoReference};
use crate::tile::{is_blank, save_tile, TILE_EXTENSION};
use crate::zoom::ZoomLevels;

/// Errors that abort splitting one raster.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The raster file does not exist.
    #[error("Raster not found: {0}")]
    RasterNotFound(PathBuf),

    /// The raster could not be decoded.
    #[error("Failed to decode raster {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// The `.geo` sidecar is missing.
    #[error("Geo-reference sidecar not found: {0} (required for geo referencing)")]
    MissingSidecar(PathBuf),

    /// The `.geo` sidecar is invalid.
    #[error("Invalid geo-reference {path}: {source}")]
    GeoRef {
        path: PathBuf,
        source: GeoRefError,
    },

    /// Invalid splitter options.
    #[error("Invalid split options: {0}")]
    InvalidOptions(String),

    /// The worker pool could not be created.
    #[error("Failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Splitter options.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Write tiles with no coverage instead of skipping them.
    pub blank_tiles: bool,
    /// Rendering threads.
    pub workers: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            blank_tiles: false,
            workers: default_workers(),
        }
    }
}

impl SplitOptions {
    /// Sets whether blank tiles are written.
    pub fn with_blank_tiles(mut self, blank_tiles: bool) -> Self {
        self.blank_tiles = blank_tiles;
        self
    }

    /// Sets the rendering thread count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Counts from a split run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Zoom levels processed.
    pub zoom_levels: usize,
    /// Tiles written.
    pub written: u64,
    /// Tiles skipped because they carried no coverage.
    pub blank_skipped: u64,
    /// Tiles that failed to write.
    pub failed: u64,
    /// True if the run was cancelled before finishing.
    pub cancelled: bool,
}

impl SplitSummary {
    /// Adds another summary's counts to this one.
    pub fn absorb(&mut self, other: &SplitSummary) {
        self.zoom_levels += other.zoom_levels;
        self.written += other.written;
        self.blank_skipped += other.blank_skipped;
        self.failed += other.failed;
        self.cancelled |= other.cancelled;
    }

    fn add(mut self, outcome: TileOutcome) -> Self {
        match outcome {
            TileOutcome::Written => self.written += 1,
            TileOutcome::Blank => self.blank_skipped += 1,
            TileOutcome::Failed => self.failed += 1,
            TileOutcome::Cancelled => self.cancelled = true,
        }
        self
    }

    fn merge(mut self, other: SplitSummary) -> Self {
        self.absorb(&other);
        self
    }
}

enum TileOutcome {
    Written,
    Blank,
    Failed,
    Cancelled,
}

/// Cuts georeferenced rasters into tiles.
pub struct TileSplitter {
    options: SplitOptions,
    pool: rayon::ThreadPool,
}

impl TileSplitter {
    /// Creates a splitter with its own rendering pool.
    pub fn new(options: SplitOptions) -> Result<Self, SplitError> {
        if options.workers == 0 {
            return Err(SplitError::InvalidOptions(
                "worker count must be >= 1".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .thread_name(|i| format!("rftiles-split-{}", i))
            .build()?;

        Ok(Self { options, pool })
    }

    /// The splitter's options.
    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// Loads a raster and its `.geo` sidecar and splits it.
    pub fn split_file(
        &self,
        raster_path: &Path,
        out_dir: &Path,
        zooms: &ZoomLevels,
        cancel: &CancellationToken,
    ) -> Result<SplitSummary, SplitError> {
        if !raster_path.is_file() {
            return Err(SplitError::RasterNotFound(raster_path.to_path_buf()));
        }

        let geo_path = sidecar_path(raster_path);
        if !geo_path.is_file() {
            return Err(SplitError::MissingSidecar(geo_path));
        }
        let georef = GeoReference::from_file(&geo_path).map_err(|source| SplitError::GeoRef {
            path: geo_path.clone(),
            source,
        })?;

        let raster = image::open(raster_path)
            .map_err(|source| SplitError::Decode {
                path: raster_path.to_path_buf(),
                source,
            })?
            .into_rgba8();

        if raster.dimensions() != (georef.width(), georef.height()) {
            warn!(
                raster = %raster_path.display(),
                raster_width = raster.width(),
                raster_height = raster.height(),
                geo_width = georef.width(),
                geo_height = georef.height(),
                "Raster size differs from geo-reference IMAGESIZE"
            );
        }

        info!(
            raster = %raster_path.display(),
            geo = %geo_path.display(),
            out = %out_dir.display(),
            zooms = %zooms,
            "Splitting raster"
        );

        Ok(self.split(&raster, &georef, out_dir, zooms, cancel))
    }

    /// Splits an in-memory raster at every requested zoom level.
    pub fn split(
        &self,
        raster: &RgbaImage,
        georef: &GeoReference,
        out_dir: &Path,
        zooms: &ZoomLevels,
        cancel: &CancellationToken,
    ) -> SplitSummary {
        let mut summary = SplitSummary::default();

        for zoom in zooms.iter() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let zoom_summary = self.split_zoom(raster, georef, out_dir, zoom, cancel);
            summary.absorb(&zoom_summary);
        }

        summary
    }

    /// Splits an in-memory raster at one zoom level.
    pub fn split_zoom(
        &self,
        raster: &RgbaImage,
        georef: &GeoReference,
        out_dir: &Path,
        zoom: u8,
        cancel: &CancellationToken,
    ) -> SplitSummary {
        let Some(range) = TileRange::covering(georef, zoom) else {
            warn!(zoom = zoom, "Raster lies outside the Web Mercator band, nothing to split");
            return SplitSummary {
                zoom_levels: 1,
                ..Default::default()
            };
        };

        info!(
            zoom = zoom,
            x = ?range.x,
            y = ?range.y,
            tiles = range.len(),
            "Generating tiles"
        );

        let addresses: Vec<TileAddress> = range.addresses().collect();
        let blank_tiles = self.options.blank_tiles;

        let mut summary = self.pool.install(|| {
            addresses
                .par_iter()
                .map(|&address| {
                    if cancel.is_cancelled() {
                        return TileOutcome::Cancelled;
                    }
                    split_one(raster, georef, out_dir, address, blank_tiles)
                })
                .fold(SplitSummary::default, SplitSummary::add)
                .reduce(SplitSummary::default, SplitSummary::merge)
        });
        summary.zoom_levels = 1;

        debug!(
            zoom = zoom,
            written = summary.written,
            blank = summary.blank_skipped,
            failed = summary.failed,
            "Zoom level done"
        );

        summary
    }
}

fn split_one(
    raster: &RgbaImage,
    georef: &GeoReference,
    out_dir: &Path,
    address: TileAddress,
    blank_tiles: bool,
) -> TileOutcome {
    let tile = render_tile(raster, georef, address);
    let path = address.path(out_dir, TILE_EXTENSION);

    if !blank_tiles && is_blank(&tile) {
        debug!(tile = %address, "Skipping blank tile");
        return TileOutcome::Blank;
    }

    match save_tile(&path, &tile) {
        Ok(()) => {
            debug!(path = %path.display(), "Created tile");
            TileOutcome::Written
        }
        Err(e) => {
            warn!(tile = %address, error = %e, "Failed to write tile");
            TileOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::tile_to_lat_lon;
    use crate::tile::load_tile;
    use image::Rgba;
    use tempfile::TempDir;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn georef_for_tile(address: TileAddress) -> GeoReference {
        let (north, west) = tile_to_lat_lon(address.x as f64, address.y as f64, address.zoom);
        let (south, east) =
            tile_to_lat_lon(address.x as f64 + 1.0, address.y as f64 + 1.0, address.zoom);
        GeoReference::new(north, south, west, east, 512, 512).unwrap()
    }

    fn splitter(blank_tiles: bool) -> TileSplitter {
        TileSplitter::new(
            SplitOptions::default()
                .with_workers(2)
                .with_blank_tiles(blank_tiles),
        )
        .unwrap()
    }

    fn count_pngs(root: &Path) -> usize {
        let mut count = 0;
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.extension().is_some_and(|e| e == "png") {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_rejects_zero_workers() {
        assert!(matches!(
            TileSplitter::new(SplitOptions::default().with_workers(0)),
            Err(SplitError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_red_raster_yields_one_tile() {
        let temp = TempDir::new().unwrap();
        let address = TileAddress::new(10, 545, 361);
        let raster = RgbaImage::from_pixel(512, 512, RED);

        let summary = splitter(false).split_zoom(
            &raster,
            &georef_for_tile(address),
            temp.path(),
            10,
            &CancellationToken::new(),
        );

        assert_eq!(summary.written, 1);
        assert_eq!(count_pngs(temp.path()), 1);
        let tile = load_tile(&address.path(temp.path(), TILE_EXTENSION)).unwrap();
        assert!(tile.pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_white_raster_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let address = TileAddress::new(10, 545, 361);
        let raster = RgbaImage::from_pixel(512, 512, Rgba([255, 255, 255, 255]));

        let summary = splitter(false).split_zoom(
            &raster,
            &georef_for_tile(address),
            temp.path(),
            10,
            &CancellationToken::new(),
        );

        assert_eq!(summary.written, 0);
        assert_eq!(summary.blank_skipped, 1);
        assert_eq!(count_pngs(temp.path()), 0);
        assert!(!temp.path().join("10").exists(), "no directory for skipped tiles");
    }

    #[test]
    fn test_subnormal_extent_is_skipped() {
        let temp = TempDir::new().unwrap();
        let georef = GeoReference::new(1e-310, 0.0, 0.0, 1e-310, 1, 1).unwrap();
        let raster = RgbaImage::from_pixel(1, 1, RED);

        let summary =
            splitter(false).split_zoom(&raster, &georef, temp.path(), 10, &CancellationToken::new());

        assert_eq!(summary.failed, 0);
        assert_eq!(summary.written, 0);
        assert_eq!(summary.blank_skipped, 1);
        assert_eq!(count_pngs(temp.path()), 0);
    }

    #[test]
    fn test_white_raster_with_blank_tiles() {
        let temp = TempDir::new().unwrap();
        let address = TileAddress::new(10, 545, 361);
        let raster = RgbaImage::from_pixel(512, 512, Rgba([255, 255, 255, 255]));

        let summary = splitter(true).split_zoom(
            &raster,
            &georef_for_tile(address),
            temp.path(),
            10,
            &CancellationToken::new(),
        );

        assert_eq!(summary.written, 1);
        let tile = load_tile(&address.path(temp.path(), TILE_EXTENSION)).unwrap();
        assert!(is_blank(&tile));
    }

    #[test]
    fn test_multiple_zoom_levels() {
        let temp = TempDir::new().unwrap();
        let address = TileAddress::new(10, 545, 361);
        let raster = RgbaImage::from_pixel(512, 512, RED);
        let zooms = ZoomLevels::parse(&["9-11"]).unwrap();

        let summary = splitter(false).split(
            &raster,
            &georef_for_tile(address),
            temp.path(),
            &zooms,
            &CancellationToken::new(),
        );

        assert_eq!(summary.zoom_levels, 3);
        // 1 tile at z9, 1 at z10, 4 at z11
        assert_eq!(summary.written, 6);
        assert_eq!(count_pngs(temp.path()), 6);
    }

    #[test]
    fn test_cancelled_split_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let address = TileAddress::new(10, 545, 361);
        let raster = RgbaImage::from_pixel(512, 512, RED);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = splitter(false).split(
            &raster,
            &georef_for_tile(address),
            temp.path(),
            &ZoomLevels::default_split(),
            &cancel,
        );

        assert!(summary.cancelled);
        assert_eq!(summary.written, 0);
    }

    #[test]
    fn test_split_file_requires_sidecar() {
        let temp = TempDir::new().unwrap();
        let raster_path = temp.path().join("site.ppm");
        RgbaImage::from_pixel(4, 4, RED)
            .save_with_format(&raster_path, image::ImageFormat::Png)
            .unwrap();

        let err = splitter(false)
            .split_file(
                &raster_path,
                temp.path(),
                &ZoomLevels::default_split(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, SplitError::MissingSidecar(_)));
    }

    #[test]
    fn test_split_file_missing_raster() {
        let temp = TempDir::new().unwrap();
        let err = splitter(false)
            .split_file(
                &temp.path().join("nope.ppm"),
                temp.path(),
                &ZoomLevels::default_split(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, SplitError::RasterNotFound(_)));
    }
}
