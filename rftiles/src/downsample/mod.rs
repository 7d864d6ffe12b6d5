//! Pyramid downsampling.
//!
//! Synthesizes coarser zoom levels from a populated base zoom. Every tile at
//! zoom `z` is the 2× shrink of its four children at `z + 1`:
//!
//! ```text
//!        (z, x, y)
//!            ▲
//!      shrink(512 → 256)
//!            ▲
//!   ┌─────────┬─────────┐
//!   │ 2x, 2y  │ 2x+1,2y │
//!   ├─────────┼─────────┤
//!   │ 2x,2y+1 │2x+1,2y+1│
//!   └─────────┴─────────┘
//! ```
//!
//! The recursion runs depth-first from each root down to the base zoom, so
//! each base tile is read once and every intermediate tile is held in memory
//! only until its parent is assembled. Quadrants are evaluated in parallel
//! with `rayon::join`.
//!
//! An [`OccupancyIndex`] built from a single scan of the base zoom prunes
//! empty subtrees before they are visited. Empty quadrants share one
//! placeholder image; a parent of four placeholders is never written.

mod index;
mod shrink;

pub use index::OccupancyIndex;
pub use shrink::{assemble, shrink, ShrinkFilter};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use image::{imageops, RgbaImage};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::TileAddress;
use crate::executor::default_workers;
use crate::tile::{blank_tile, load_tile, save_tile, TILE_EXTENSION, TILE_SIZE};
use crate::zoom::{ZoomError, ZoomLevels};

/// Shared fully transparent placeholder for empty quadrants.
static PLACEHOLDER: OnceLock<Arc<RgbaImage>> = OnceLock::new();

/// Returns the shared placeholder tile.
///
/// Every call returns a clone of the same `Arc`, so emptiness is checked
/// with [`Arc::ptr_eq`] rather than by comparing pixels.
pub fn placeholder() -> Arc<RgbaImage> {
    Arc::clone(PLACEHOLDER.get_or_init(|| Arc::new(blank_tile())))
}

/// True if `tile` is the shared placeholder.
pub fn is_placeholder(tile: &Arc<RgbaImage>) -> bool {
    PLACEHOLDER
        .get()
        .is_some_and(|shared| Arc::ptr_eq(shared, tile))
}

/// Errors that prevent downsampling from starting.
#[derive(Debug, Error)]
pub enum DownsampleError {
    /// The pyramid root does not exist.
    #[error("Directory does not exist: {0}")]
    RootNotFound(PathBuf),

    /// The base zoom directory does not exist or cannot be read.
    #[error("Directory for zoom level {zoom} cannot be read: {path}: {source}")]
    BaseZoom {
        zoom: u8,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Requested levels are not coarser than the base zoom.
    #[error("Only coarser zoom levels can be generated: {0}")]
    Zoom(#[from] ZoomError),

    /// Invalid downsampler options.
    #[error("Invalid downsample options: {0}")]
    InvalidOptions(String),

    /// The worker pool could not be created.
    #[error("Failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Downsampler options.
#[derive(Debug, Clone)]
pub struct DownsampleOptions {
    /// Worker threads for quadrant evaluation.
    pub workers: usize,
    /// 2× shrink filter.
    pub filter: ShrinkFilter,
}

impl Default for DownsampleOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            filter: ShrinkFilter::default(),
        }
    }
}

impl DownsampleOptions {
    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the shrink filter.
    pub fn with_filter(mut self, filter: ShrinkFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Counts from a downsample run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownsampleSummary {
    /// Populated base tiles found.
    pub base_tiles: u64,
    /// Root addresses at the coarsest requested zoom.
    pub roots: u64,
    /// Base tiles read from disk.
    pub tiles_read: u64,
    /// Base tiles that could not be decoded.
    pub unreadable: u64,
    /// Tiles written at requested zoom levels.
    pub written: u64,
    /// Tiles that failed to write.
    pub failed: u64,
    /// True if the run stopped early.
    pub cancelled: bool,
}

#[derive(Default)]
struct Counters {
    tiles_read: AtomicU64,
    unreadable: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
}

struct Run<'a> {
    root: &'a Path,
    base_zoom: u8,
    zooms: &'a ZoomLevels,
    filter: ShrinkFilter,
    index: OccupancyIndex,
    counters: Counters,
    cancel: &'a CancellationToken,
}

/// Derives coarser zoom levels from a populated base zoom.
pub struct PyramidDownsampler {
    options: DownsampleOptions,
    pool: rayon::ThreadPool,
}

impl PyramidDownsampler {
    /// Creates a downsampler with its own worker pool.
    pub fn new(options: DownsampleOptions) -> Result<Self, DownsampleError> {
        if options.workers == 0 {
            return Err(DownsampleError::InvalidOptions(
                "worker count must be >= 1".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .thread_name(|i| format!("rftiles-downsample-{}", i))
            .build()?;

        Ok(Self { options, pool })
    }

    /// The downsampler's options.
    pub fn options(&self) -> &DownsampleOptions {
        &self.options
    }

    /// Writes every level in `zooms` under `root` from the tiles at
    /// `base_zoom`.
    pub fn downsample(
        &self,
        root: &Path,
        base_zoom: u8,
        zooms: &ZoomLevels,
        cancel: &CancellationToken,
    ) -> Result<DownsampleSummary, DownsampleError> {
        if !root.is_dir() {
            return Err(DownsampleError::RootNotFound(root.to_path_buf()));
        }
        zooms.ensure_below(base_zoom)?;

        let index = OccupancyIndex::scan(root, base_zoom, zooms.min()).map_err(|source| {
            DownsampleError::BaseZoom {
                zoom: base_zoom,
                path: root.join(base_zoom.to_string()),
                source,
            }
        })?;

        let roots = index.at_zoom(zooms.min());
        info!(
            root = %root.display(),
            base_zoom = base_zoom,
            zooms = %zooms,
            base_tiles = index.base_tiles(),
            roots = roots.len(),
            filter = %self.options.filter,
            "Downsampling"
        );

        let run = Run {
            root,
            base_zoom,
            zooms,
            filter: self.options.filter,
            index,
            counters: Counters::default(),
            cancel,
        };

        self.pool.install(|| {
            for address in &roots {
                if cancel.is_cancelled() {
                    break;
                }
                debug!(root = %address, "Downsampling subtree");
                run.tile(*address);
            }
        });

        let summary = DownsampleSummary {
            base_tiles: run.index.base_tiles() as u64,
            roots: roots.len() as u64,
            tiles_read: run.counters.tiles_read.load(Ordering::Relaxed),
            unreadable: run.counters.unreadable.load(Ordering::Relaxed),
            written: run.counters.written.load(Ordering::Relaxed),
            failed: run.counters.failed.load(Ordering::Relaxed),
            cancelled: cancel.is_cancelled(),
        };

        info!(
            written = summary.written,
            failed = summary.failed,
            unreadable = summary.unreadable,
            "Downsample complete"
        );

        Ok(summary)
    }
}

impl Run<'_> {
    /// Computes the tile at `address`, writing it if its zoom is requested.
    fn tile(&self, address: TileAddress) -> Arc<RgbaImage> {
        if self.cancel.is_cancelled() || !self.index.contains(&address) {
            return placeholder();
        }

        if address.zoom == self.base_zoom {
            return self.read_base(address);
        }

        let [tl, tr, bl, br] = address.children();
        let ((tl, tr), (bl, br)) = rayon::join(
            || rayon::join(|| self.tile(tl), || self.tile(tr)),
            || rayon::join(|| self.tile(bl), || self.tile(br)),
        );

        // Children visited after cancellation came back as placeholders, so
        // this set may be incomplete and must not be written.
        if self.cancel.is_cancelled() {
            return placeholder();
        }

        let quadrants = [&tl, &tr, &bl, &br];
        if quadrants.iter().all(|q| is_placeholder(q)) {
            return placeholder();
        }

        let canvas = assemble([&*tl, &*tr, &*bl, &*br]);
        let tile = shrink(&canvas, self.filter);

        if self.zooms.contains(address.zoom) {
            let path = address.path(self.root, TILE_EXTENSION);
            match save_tile(&path, &tile) {
                Ok(()) => {
                    self.counters.written.fetch_add(1, Ordering::Relaxed);
                    debug!(tile = %address, "Wrote downsampled tile");
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(tile = %address, error = %e, "Failed to write downsampled tile");
                }
            }
        }

        Arc::new(tile)
    }

    fn read_base(&self, address: TileAddress) -> Arc<RgbaImage> {
        let path = address.path(self.root, TILE_EXTENSION);
        match load_tile(&path) {
            Ok(tile) => {
                self.counters.tiles_read.fetch_add(1, Ordering::Relaxed);
                if tile.dimensions() == (TILE_SIZE, TILE_SIZE) {
                    Arc::new(tile)
                } else {
                    debug!(
                        tile = %address,
                        width = tile.width(),
                        height = tile.height(),
                        "Resizing odd-sized base tile"
                    );
                    Arc::new(imageops::resize(
                        &tile,
                        TILE_SIZE,
                        TILE_SIZE,
                        imageops::FilterType::Nearest,
                    ))
                }
            }
            Err(e) => {
                self.counters.unreadable.fetch_add(1, Ordering::Relaxed);
                warn!(tile = %address, error = %e, "Unreadable base tile, treating as empty");
                placeholder()
            }
        }
    }
}
