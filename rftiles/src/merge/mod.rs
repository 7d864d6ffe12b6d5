//! Pyramid merging.
//!
//! Walks two or more tile pyramids in lock-step and writes one composite
//! pyramid. At every directory level:
//!
//! 1. Every `*.png` present in any source is grouped by filename, keeping
//!    source-list order, and one [`MergeTask`] is scheduled per group.
//! 2. The union of subdirectory names is created under the destination and
//!    recursed into, in ascending numeric order.
//!
//! Traversal is sequential and acts as the producer for a [`TileExecutor`].
//! The producer blocks while the executor's backlog is full, so memory and
//! open file handles stay bounded however large the pyramids are.

mod job;

pub use job::{MergeTask, MergeTaskError};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::composite::TileCompositor;
use crate::executor::{
    default_workers, ExecutorError, ExecutorStats, TileExecutor, DEFAULT_QUEUE_FACTOR,
};
use crate::tile::TILE_EXTENSION;

/// Errors that prevent a merge from starting or continuing.
#[derive(Debug, Error)]
pub enum MergeError {
    /// No source pyramids were given.
    #[error("No source pyramids given")]
    NoSources,

    /// A source pyramid root does not exist.
    #[error("Source pyramid not found: {0}")]
    SourceNotFound(PathBuf),

    /// The destination root could not be created.
    #[error("Failed to create destination {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The executor could not be created or was shut down.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Merger options.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Compositing threads.
    pub workers: usize,
    /// Backlog slots per worker.
    pub queue_factor: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_factor: DEFAULT_QUEUE_FACTOR,
        }
    }
}

impl MergeOptions {
    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the backlog factor.
    pub fn with_queue_factor(mut self, queue_factor: usize) -> Self {
        self.queue_factor = queue_factor;
        self
    }
}

/// Counts from a merge run.
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    /// Destination directories visited.
    pub directories: u64,
    /// Tasks handed to the executor.
    pub scheduled: u64,
    /// Tiles written, composited or copied.
    pub written: u64,
    /// Tiles copied from a single source.
    pub copied: u64,
    /// Tasks that failed or panicked.
    pub failed: u64,
    /// Directories skipped because of a non-numeric name.
    pub skipped_directories: u64,
    /// True if the walk stopped early.
    pub cancelled: bool,
    /// Executor statistics, including individual failures.
    pub executor: ExecutorStats,
}

impl MergeSummary {
    /// Tiles produced by compositing two or more sources.
    pub fn composited(&self) -> u64 {
        self.written.saturating_sub(self.copied)
    }
}

/// Merges tile pyramids with a [`TileCompositor`].
pub struct PyramidMerger {
    compositor: Arc<dyn TileCompositor>,
    options: MergeOptions,
}

struct Walk<'a> {
    executor: TileExecutor,
    compositor: Arc<dyn TileCompositor>,
    copied: Arc<AtomicU64>,
    cancel: &'a CancellationToken,
    summary: MergeSummary,
}

impl PyramidMerger {
    /// Creates a merger.
    pub fn new(compositor: Arc<dyn TileCompositor>, options: MergeOptions) -> Self {
        Self {
            compositor,
            options,
        }
    }

    /// Merges `sources` into `destination`.
    ///
    /// Returns once every scheduled task has finished, including after
    /// cancellation. Per-tile failures are counted in the summary.
    pub fn merge(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<MergeSummary, MergeError> {
        if sources.is_empty() {
            return Err(MergeError::NoSources);
        }
        if let Some(missing) = sources.iter().find(|s| !s.is_dir()) {
            return Err(MergeError::SourceNotFound(missing.clone()));
        }
        std::fs::create_dir_all(destination).map_err(|source| MergeError::CreateDestination {
            path: destination.to_path_buf(),
            source,
        })?;

        info!(
            sources = sources.len(),
            destination = %destination.display(),
            workers = self.options.workers,
            compositor = self.compositor.name(),
            "Merging tile pyramids"
        );

        let mut walk = Walk {
            executor: TileExecutor::new(self.options.workers, self.options.queue_factor)?,
            compositor: Arc::clone(&self.compositor),
            copied: Arc::new(AtomicU64::new(0)),
            cancel,
            summary: MergeSummary::default(),
        };

        let walked = walk.visit(sources, destination);
        if walked.is_err() {
            warn!("Merge aborted, waiting for scheduled tiles");
        }

        let Walk {
            executor,
            copied,
            mut summary,
            ..
        } = walk;

        let stats = executor.drain();
        walked?;

        summary.written = stats.succeeded;
        summary.failed = stats.failed + stats.panicked;
        summary.copied = copied.load(Ordering::Relaxed);
        summary.executor = stats;

        info!(
            directories = summary.directories,
            scheduled = summary.scheduled,
            written = summary.written,
            copied = summary.copied,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Merge complete"
        );

        Ok(summary)
    }
}

impl Walk<'_> {
    fn visit(&mut self, sources: &[PathBuf], destination: &Path) -> Result<(), MergeError> {
        if self.cancel.is_cancelled() {
            self.summary.cancelled = true;
            return Ok(());
        }
        self.summary.directories += 1;

        let listing = list_level(sources);

        for (name, tile_sources) in listing.tiles {
            if self.cancel.is_cancelled() {
                self.summary.cancelled = true;
                return Ok(());
            }

            let task = MergeTask {
                sources: tile_sources,
                destination: destination.join(&name),
            };
            let label = task.label();
            debug!(task = %label, "Scheduling tile");

            let job = task.into_job(Arc::clone(&self.compositor), Arc::clone(&self.copied));
            self.executor.submit(label, job)?;
            self.summary.scheduled += 1;
        }

        for (index, name) in listing.directories {
            let Some(index) = index else {
                warn!(
                    directory = %destination.join(&name).display(),
                    "Skipping non-numeric directory"
                );
                self.summary.skipped_directories += 1;
                continue;
            };

            let child = destination.join(&name);
            if let Err(e) = std::fs::create_dir_all(&child) {
                warn!(
                    directory = %child.display(),
                    error = %e,
                    "Failed to create directory, skipping subtree"
                );
                continue;
            }

            let child_sources: Vec<PathBuf> = sources
                .iter()
                .map(|s| s.join(&name))
                .filter(|s| s.is_dir())
                .collect();

            debug!(directory = index, sources = child_sources.len(), "Descending");
            self.visit(&child_sources, &child)?;

            if self.summary.cancelled {
                return Ok(());
            }
        }

        Ok(())
    }
}

/// Contents of one directory level across all sources.
#[derive(Debug, Default)]
struct Level {
    /// Tile filename to source paths, in numeric stem order.
    tiles: Vec<(String, Vec<PathBuf>)>,
    /// Subdirectory names, numeric ones first in ascending order.
    directories: Vec<(Option<u64>, String)>,
}

fn list_level(sources: &[PathBuf]) -> Level {
    let mut tiles: BTreeMap<SortKey, Vec<PathBuf>> = BTreeMap::new();
    let mut directories: BTreeSet<SortKey> = BTreeSet::new();

    for source in sources {
        let entries = match std::fs::read_dir(source) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(directory = %source.display(), error = %e, "Failed to read directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
                warn!(path = %path.display(), "Skipping non-UTF-8 path");
                continue;
            };

            if path.is_dir() {
                directories.insert(SortKey::new(&name, &name));
            } else if path.extension().is_some_and(|e| e == TILE_EXTENSION) {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_owned();
                tiles.entry(SortKey::new(&stem, &name)).or_default().push(path);
            }
        }
    }

    Level {
        tiles: tiles.into_iter().map(|(key, paths)| (key.name, paths)).collect(),
        directories: directories
            .into_iter()
            .map(|key| (key.index, key.name))
            .collect(),
    }
}

/// Orders numeric names by value, then anything else by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    non_numeric: bool,
    index: Option<u64>,
    name: String,
}

impl SortKey {
    fn new(stem: &str, name: &str) -> Self {
        let index = stem.parse::<u64>().ok();
        Self {
            non_numeric: index.is_none(),
            index,
            name: name.to_owned(),
        }
    }
}
