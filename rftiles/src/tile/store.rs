//! Tile persistence.
//!
//! Tiles are encoded fully in memory, written to a `.part` sibling and then
//! renamed into place, so a reader never observes a half-written tile.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;

/// Suffix appended to a tile path while it is being written.
pub const PARTIAL_SUFFIX: &str = "part";

/// Errors from reading or writing tiles.
#[derive(Debug, Error)]
pub enum TileIoError {
    /// The tile could not be opened or decoded.
    #[error("Failed to decode tile {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// The tile could not be encoded.
    #[error("Failed to encode tile {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// Filesystem error while writing.
    #[error("Failed to write tile {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create the tile's directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Loads a tile and converts it to RGBA8.
pub fn load_tile(path: &Path) -> Result<RgbaImage, TileIoError> {
    let image = image::open(path).map_err(|source| TileIoError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.into_rgba8())
}

/// Persists a tile as PNG, creating parent directories as needed.
///
/// Safe to call concurrently for sibling tiles whose parent directory does
/// not exist yet.
pub fn save_tile(path: &Path, image: &RgbaImage) -> Result<(), TileIoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| TileIoError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(|source| TileIoError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    let partial = partial_path(path);
    let write_err = |source| TileIoError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Err(e) = std::fs::write(&partial, encoded.get_ref()) {
        let _ = std::fs::remove_file(&partial);
        return Err(write_err(e));
    }
    std::fs::rename(&partial, path).map_err(|e| {
        let _ = std::fs::remove_file(&partial);
        write_err(e)
    })
}

/// Copies a tile file verbatim, with the same atomic rename as [`save_tile`].
pub fn copy_tile(source: &Path, destination: &Path) -> Result<(), TileIoError> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|source| TileIoError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let partial = partial_path(destination);
    std::fs::copy(source, &partial)
        .and_then(|_| std::fs::rename(&partial, destination))
        .map_err(|e| {
            let _ = std::fs::remove_file(&partial);
            TileIoError::Write {
                path: destination.to_path_buf(),
                source: e,
            }
        })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
