//! Occupancy index of a populated base zoom.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use crate::coord::TileAddress;
use crate::tile::TILE_EXTENSION;

/// Every address, from the base zoom up to a minimum zoom, that has at
/// least one populated base tile beneath it.
#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    base_zoom: u8,
    min_zoom: u8,
    occupied: HashSet<TileAddress>,
    base_tiles: usize,
}

impl OccupancyIndex {
    /// Scans `<root>/<base_zoom>/<x>/<y>.png` once.
    ///
    /// Non-numeric directory and file names are ignored.
    pub fn scan(root: &Path, base_zoom: u8, min_zoom: u8) -> std::io::Result<Self> {
        let mut index = Self {
            base_zoom,
            min_zoom,
            ..Default::default()
        };

        let zoom_dir = root.join(base_zoom.to_string());
        for column in std::fs::read_dir(&zoom_dir)?.flatten() {
            let column_path = column.path();
            if !column_path.is_dir() {
                continue;
            }
            let Some(x) = parse_index(column_path.file_name().and_then(|n| n.to_str())) else {
                warn!(directory = %column_path.display(), "Skipping non-numeric directory");
                continue;
            };

            let rows = match std::fs::read_dir(&column_path) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(
                        directory = %column_path.display(),
                        error = %e,
                        "Failed to read directory"
                    );
                    continue;
                }
            };

            for row in rows.flatten() {
                let path = row.path();
                if !path.extension().is_some_and(|e| e == TILE_EXTENSION) {
                    continue;
                }
                if let Some(y) = parse_index(path.file_stem().and_then(|s| s.to_str())) {
                    index.insert(TileAddress::new(base_zoom, x, y));
                }
            }
        }

        debug!(
            base_zoom = base_zoom,
            base_tiles = index.base_tiles,
            occupied = index.occupied.len(),
            "Scanned base zoom"
        );

        Ok(index)
    }

    /// Records a populated base tile and all its ancestors down to the
    /// minimum zoom.
    pub fn insert(&mut self, address: TileAddress) {
        if address.zoom != self.base_zoom || !address.is_valid() || self.contains(&address) {
            return;
        }
        self.base_tiles += 1;

        let mut current = Some(address);
        while let Some(tile) = current {
            if tile.zoom < self.min_zoom || !self.occupied.insert(tile) {
                // Ancestors of an already known tile are known too
                break;
            }
            current = tile.parent();
        }
    }

    /// True if a populated base tile lies under `address`.
    pub fn contains(&self, address: &TileAddress) -> bool {
        self.occupied.contains(address)
    }

    /// Occupied addresses at `zoom`, sorted.
    pub fn at_zoom(&self, zoom: u8) -> Vec<TileAddress> {
        let mut tiles: Vec<_> = self
            .occupied
            .iter()
            .filter(|t| t.zoom == zoom)
            .copied()
            .collect();
        tiles.sort();
        tiles
    }

    /// Number of populated base tiles.
    pub fn base_tiles(&self) -> usize {
        self.base_tiles
    }
}

fn parse_index(name: Option<&str>) -> Option<u32> {
    name.and_then(|n| n.parse().ok())
}
