//! Tile compositing.
//!
//! Merges several same-size tiles into one by a per-pixel selection rule
//! driven by the [`PriorityTable`](crate::priority::PriorityTable).
//!
//! # Rule
//!
//! The destination starts as the first source. Each further source is folded
//! in, left to right, pixel by pixel:
//!
//! 1. A transparent destination pixel is always replaced.
//! 2. If either pixel is not in the table, the destination is kept.
//! 3. Otherwise the candidate wins only with a strictly lower rank.
//!
//! Colors outside the table are never authoritative, so rendering artifacts
//! cannot overwrite a real signal band.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ PyramidMerger /     │
//! │ PyramidDownsampler  │
//! │ Arc<dyn TileCompositor>
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │  TileCompositor     │ (trait)
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │ PriorityCompositor  │ (CPU)
//! └─────────────────────┘
//! ```

mod priority;

pub use priority::PriorityCompositor;

use image::RgbaImage;
use thiserror::Error;

/// Errors from compositing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompositeError {
    /// No source images were given.
    #[error("No source tiles to composite")]
    NoSources,

    /// Sources differ in size.
    #[error("Source {index} is {actual_width}×{actual_height}, expected {width}×{height}")]
    DimensionMismatch {
        index: usize,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// Strategy for combining same-address tiles into one.
///
/// Implementations must be thread-safe; the merger calls them from many
/// worker threads at once. Any implementation must fold sources left to
/// right in the order given and agree bit-for-bit with
/// [`PriorityCompositor`] for colors present in the table.
pub trait TileCompositor: Send + Sync {
    /// Composites `sources` into a new image.
    fn composite(&self, sources: &[RgbaImage]) -> Result<RgbaImage, CompositeError>;

    /// Short name for logging.
    fn name(&self) -> &str;
}

/// Checks that all sources share the first source's dimensions.
pub(crate) fn check_dimensions(sources: &[RgbaImage]) -> Result<(u32, u32), CompositeError> {
    let first = sources.first().ok_or(CompositeError::NoSources)?;
    let (width, height) = first.dimensions();

    for (index, source) in sources.iter().enumerate().skip(1) {
        let (actual_width, actual_height) = source.dimensions();
        if (actual_width, actual_height) != (width, height) {
            return Err(CompositeError::DimensionMismatch {
                index,
                width,
                height,
                actual_width,
                actual_height,
            });
        }
    }

    Ok((width, height))
}
