//! One merge task: composite same-address tiles into the destination.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::composite::{CompositeError, TileCompositor};
use crate::tile::{copy_tile, load_tile, save_tile, TileIoError};

/// Errors from a single merge task.
#[derive(Debug, Error)]
pub enum MergeTaskError {
    /// A source or destination tile could not be read or written.
    #[error(transparent)]
    Io(#[from] TileIoError),

    /// Sources could not be composited.
    #[error("Failed to composite {destination}: {source}")]
    Composite {
        destination: PathBuf,
        source: CompositeError,
    },
}

/// Same-address tiles from several pyramids and where their composite goes.
#[derive(Debug, Clone)]
pub struct MergeTask {
    /// Source tiles, in source-list order.
    pub sources: Vec<PathBuf>,
    /// Output tile path.
    pub destination: PathBuf,
}

impl MergeTask {
    /// Executes the task.
    ///
    /// A single source is copied verbatim; otherwise the sources are loaded,
    /// composited and re-encoded.
    pub fn run(
        self,
        compositor: &dyn TileCompositor,
        copied: &AtomicU64,
    ) -> Result<(), MergeTaskError> {
        if let [only] = self.sources.as_slice() {
            copy_tile(only, &self.destination)?;
            copied.fetch_add(1, Ordering::Relaxed);
            trace!(destination = %self.destination.display(), "Copied tile");
            return Ok(());
        }

        let images = self
            .sources
            .iter()
            .map(|path| load_tile(path))
            .collect::<Result<Vec<_>, _>>()?;

        let merged = compositor
            .composite(&images)
            .map_err(|source| MergeTaskError::Composite {
                destination: self.destination.clone(),
                source,
            })?;

        save_tile(&self.destination, &merged)?;
        trace!(
            destination = %self.destination.display(),
            sources = self.sources.len(),
            "Composited tile"
        );
        Ok(())
    }

    /// Label used in executor logs.
    pub fn label(&self) -> String {
        label_for(&self.destination, self.sources.len())
    }

    /// Moves the task into an executor job.
    pub(crate) fn into_job(
        self,
        compositor: Arc<dyn TileCompositor>,
        copied: Arc<AtomicU64>,
    ) -> impl FnOnce() -> Result<(), MergeTaskError> + Send + 'static {
        move || self.run(compositor.as_ref(), &copied)
    }
}

fn label_for(destination: &Path, sources: usize) -> String {
    format!("{} ({} sources)", destination.display(), sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::PriorityCompositor;
    use crate::tile::{blank_tile, TRANSPARENT};
    use image::Rgba;
    use tempfile::TempDir;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 208, 0, 255]);

    fn compositor() -> PriorityCompositor {
        PriorityCompositor::new(Arc::new(Default::default()))
    }

    #[test]
    fn test_single_source_is_copied() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a").join("1.png");
        save_tile(&source, &blank_tile()).unwrap();

        let task = MergeTask {
            sources: vec![source.clone()],
            destination: temp.path().join("out").join("1.png"),
        };
        let copied = AtomicU64::new(0);
        task.clone().run(&compositor(), &copied).unwrap();

        assert_eq!(copied.load(Ordering::Relaxed), 1);
        assert_eq!(
            std::fs::read(&source).unwrap(),
            std::fs::read(&task.destination).unwrap()
        );
    }

    #[test]
    fn test_sources_are_composited() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.png");
        let b = temp.path().join("b.png");

        let mut green = blank_tile();
        green.put_pixel(0, 0, GREEN);
        green.put_pixel(1, 0, GREEN);
        let mut red = blank_tile();
        red.put_pixel(0, 0, RED);
        save_tile(&a, &green).unwrap();
        save_tile(&b, &red).unwrap();

        let destination = temp.path().join("merged.png");
        let copied = AtomicU64::new(0);
        MergeTask {
            sources: vec![a, b],
            destination: destination.clone(),
        }
        .run(&compositor(), &copied)
        .unwrap();

        let merged = load_tile(&destination).unwrap();
        assert_eq!(merged.get_pixel(0, 0), &RED);
        assert_eq!(merged.get_pixel(1, 0), &GREEN);
        assert_eq!(merged.get_pixel(2, 0), &TRANSPARENT);
        assert_eq!(copied.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_unreadable_source_fails_task() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.png");
        let bad = temp.path().join("bad.png");
        save_tile(&good, &blank_tile()).unwrap();
        std::fs::write(&bad, b"not a png").unwrap();

        let destination = temp.path().join("merged.png");
        let err = MergeTask {
            sources: vec![good, bad],
            destination: destination.clone(),
        }
        .run(&compositor(), &AtomicU64::new(0))
        .unwrap_err();

        assert!(matches!(err, MergeTaskError::Io(TileIoError::Decode { .. })));
        assert!(!destination.exists());
    }
}
