//! CPU implementation of the priority compositing rule.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use super::{check_dimensions, CompositeError, TileCompositor};
use crate::priority::PriorityTable;
use crate::tile::is_transparent;

/// Composites tiles on the CPU using a shared priority table.
#[derive(Debug, Clone)]
pub struct PriorityCompositor {
    table: Arc<PriorityTable>,
}

impl PriorityCompositor {
    /// Creates a compositor over the given table.
    pub fn new(table: Arc<PriorityTable>) -> Self {
        Self { table }
    }

    /// The table this compositor ranks colors with.
    pub fn table(&self) -> &PriorityTable {
        &self.table
    }

    /// Folds one candidate pixel into the destination pixel.
    #[inline]
    pub fn select(&self, destination: Rgba<u8>, candidate: Rgba<u8>) -> Rgba<u8> {
        if is_transparent(&destination) {
            return candidate;
        }

        match (self.table.rank(&destination), self.table.rank(&candidate)) {
            (Some(current), Some(challenger)) if challenger < current => candidate,
            _ => destination,
        }
    }
}

impl TileCompositor for PriorityCompositor {
    fn composite(&self, sources: &[RgbaImage]) -> Result<RgbaImage, CompositeError> {
        check_dimensions(sources)?;

        let mut destination = sources[0].clone();
        if sources.len() == 1 {
            return Ok(destination);
        }

        // Source-major order keeps the per-pixel fold left to right
        for source in &sources[1..] {
            for (dst, src) in destination.pixels_mut().zip(source.pixels()) {
                *dst = self.select(*dst, *src);
            }
        }

        Ok(destination)
    }

    fn name(&self) -> &str {
        "priority"
    }
}
