//! Bounded tile-job executor.
//!
//! A single producer (the pyramid walker) submits CPU-bound tile jobs to a
//! fixed-size worker pool. Two semaphores shape the flow:
//!
//! ```text
//!  producer ──submit()──► backlog (workers × queue_factor permits)
//!                              │  released when the job starts
//!                              ▼
//!                         running (workers permits)
//!                              │
//!                              ▼
//!                      spawn_blocking(job)
//! ```
//!
//! `submit()` blocks the producer thread while the backlog is full, so the
//! number of scheduled-but-unstarted jobs (and the open image handles they
//! hold) never exceeds `workers × queue_factor`. No polling is involved.
//!
//! Job failures and panics are logged and counted; they never stop the pool.
//! [`TileExecutor::drain`] waits for every submitted job before returning.

mod stats;

pub use stats::{ExecutorStats, JobFailure};

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Default ratio of backlog slots to workers.
pub const DEFAULT_QUEUE_FACTOR: usize = 4;

/// Default worker count: one per available CPU.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// Errors from creating or using the executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Worker count or queue factor of zero.
    #[error("Invalid executor configuration: {0}")]
    InvalidConfig(String),

    /// The Tokio runtime could not be built.
    #[error("Failed to create runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// The executor's semaphores were closed.
    #[error("Executor is shut down")]
    Closed,
}

enum JobOutcome {
    Succeeded,
    Failed(JobFailure),
    Panicked(JobFailure),
}

/// Fixed-size worker pool with blocking backpressure.
pub struct TileExecutor {
    runtime: Runtime,
    workers: usize,
    backlog_limit: usize,
    backlog: Arc<Semaphore>,
    running: Arc<Semaphore>,
    tasks: JoinSet<JobOutcome>,
    stats: Arc<Mutex<ExecutorStats>>,
}

impl TileExecutor {
    /// Creates an executor with `workers` threads and a backlog of
    /// `workers × queue_factor` jobs.
    pub fn new(workers: usize, queue_factor: usize) -> Result<Self, ExecutorError> {
        if workers == 0 {
            return Err(ExecutorError::InvalidConfig(
                "worker count must be >= 1".to_string(),
            ));
        }
        if queue_factor == 0 {
            return Err(ExecutorError::InvalidConfig(
                "queue factor must be >= 1".to_string(),
            ));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("rftiles-worker")
            .build()?;

        let backlog_limit = workers * queue_factor;

        debug!(
            workers = workers,
            backlog_limit = backlog_limit,
            "Created tile executor"
        );

        Ok(Self {
            runtime,
            workers,
            backlog_limit,
            backlog: Arc::new(Semaphore::new(backlog_limit)),
            running: Arc::new(Semaphore::new(workers)),
            tasks: JoinSet::new(),
            stats: Arc::new(Mutex::new(ExecutorStats::default())),
        })
    }

    /// Creates an executor with [`default_workers`] and [`DEFAULT_QUEUE_FACTOR`].
    pub fn with_defaults() -> Result<Self, ExecutorError> {
        Self::new(default_workers(), DEFAULT_QUEUE_FACTOR)
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Maximum number of scheduled-but-unstarted jobs.
    pub fn backlog_limit(&self) -> usize {
        self.backlog_limit
    }

    /// Number of jobs currently waiting to start.
    pub fn backlog(&self) -> usize {
        self.backlog_limit - self.backlog.available_permits()
    }

    /// Schedules a job, blocking the caller while the backlog is full.
    ///
    /// Must not be called from inside a Tokio runtime.
    pub fn submit<F, E>(&mut self, label: impl Into<String>, job: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let backlog_permit = self
            .runtime
            .block_on(Arc::clone(&self.backlog).acquire_owned())
            .map_err(|_| ExecutorError::Closed)?;

        self.reap_finished();

        let label = label.into();
        let running = Arc::clone(&self.running);
        self.stats.lock().submitted += 1;

        self.tasks.spawn_on(
            async move {
                let run_permit = running.acquire_owned().await;
                // The job counts as started from here on
                drop(backlog_permit);

                let _run_permit = match run_permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        return JobOutcome::Failed(JobFailure {
                            label,
                            reason: "executor shut down".to_string(),
                        })
                    }
                };

                let result =
                    tokio::task::spawn_blocking(move || job().map_err(|e| e.to_string())).await;

                match result {
                    Ok(Ok(())) => JobOutcome::Succeeded,
                    Ok(Err(reason)) => JobOutcome::Failed(JobFailure { label, reason }),
                    Err(join_error) => JobOutcome::Panicked(JobFailure {
                        label,
                        reason: join_error.to_string(),
                    }),
                }
            },
            self.runtime.handle(),
        );

        Ok(())
    }

    /// Waits for every submitted job and returns the final statistics.
    pub fn drain(mut self) -> ExecutorStats {
        self.wait_all();
        self.stats.lock().clone()
    }

    /// Snapshot of the statistics so far.
    pub fn stats(&self) -> ExecutorStats {
        self.stats.lock().clone()
    }

    fn wait_all(&mut self) {
        let mut tasks = std::mem::take(&mut self.tasks);
        let stats = Arc::clone(&self.stats);
        self.runtime.block_on(async move {
            while let Some(joined) = tasks.join_next().await {
                record(&stats, joined);
            }
        });
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            record(&self.stats, joined);
        }
    }
}

impl Drop for TileExecutor {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            warn!(
                pending = self.tasks.len(),
                "Tile executor dropped with pending jobs, waiting for them"
            );
            self.wait_all();
        }
    }
}

impl fmt::Debug for TileExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileExecutor")
            .field("workers", &self.workers)
            .field("backlog_limit", &self.backlog_limit)
            .field("backlog", &self.backlog())
            .field("pending", &self.tasks.len())
            .finish()
    }
}

fn record(
    stats: &Mutex<ExecutorStats>,
    joined: Result<JobOutcome, tokio::task::JoinError>,
) {
    let mut stats = stats.lock();
    match joined {
        Ok(JobOutcome::Succeeded) => stats.succeeded += 1,
        Ok(JobOutcome::Failed(failure)) => {
            warn!(job = %failure.label, reason = %failure.reason, "Tile job failed");
            stats.failed += 1;
            stats.push_failure(failure);
        }
        Ok(JobOutcome::Panicked(failure)) => {
            error!(job = %failure.label, reason = %failure.reason, "Tile job panicked");
            stats.panicked += 1;
            stats.push_failure(failure);
        }
        Err(join_error) => {
            error!(error = %join_error, "Tile job supervisor aborted");
            stats.panicked += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_rejects_zero_workers() {
        assert!(matches!(
            TileExecutor::new(0, 4),
            Err(ExecutorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_queue_factor() {
        assert!(matches!(
            TileExecutor::new(2, 0),
            Err(ExecutorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_backlog_limit() {
        let executor = TileExecutor::new(3, 4).unwrap();
        assert_eq!(executor.workers(), 3);
        assert_eq!(executor.backlog_limit(), 12);
        assert_eq!(executor.backlog(), 0);
    }

    #[test]
    fn test_runs_all_jobs_before_drain_returns() {
        let mut executor = TileExecutor::new(2, 2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..50 {
            let done = Arc::clone(&done);
            executor
                .submit(format!("job-{}", i), move || {
                    std::thread::sleep(Duration::from_millis(1));
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                })
                .unwrap();
        }

        let stats = executor.drain();
        assert_eq!(done.load(Ordering::SeqCst), 50);
        assert_eq!(stats.submitted, 50);
        assert_eq!(stats.succeeded, 50);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_failures_do_not_stop_pool() {
        let mut executor = TileExecutor::new(2, 4).unwrap();

        for i in 0..10 {
            executor
                .submit(format!("job-{}", i), move || {
                    if i % 3 == 0 {
                        Err(format!("job {} exploded", i))
                    } else {
                        Ok(())
                    }
                })
                .unwrap();
        }

        let stats = executor.drain();
        assert_eq!(stats.submitted, 10);
        assert_eq!(stats.failed, 4);
        assert_eq!(stats.succeeded, 6);
        assert_eq!(stats.failures().len(), 4);
        assert!(stats.failures().iter().any(|f| f.label == "job-3"));
    }

    #[test]
    fn test_panicking_job_is_counted() {
        let mut executor = TileExecutor::new(1, 1).unwrap();
        executor
            .submit("boom", || -> Result<(), String> { panic!("boom") })
            .unwrap();
        executor.submit("fine", || Ok::<(), String>(())).unwrap();

        let stats = executor.drain();
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.succeeded, 1);
    }

    #[test]
    fn test_producer_blocks_when_backlog_is_full() {
        let workers = 1;
        let queue_factor = 2;
        let gate = Arc::new(RwLock::new(()));
        let closed = gate.write();

        let submitted = Arc::new(AtomicUsize::new(0));
        let producer = {
            let gate = Arc::clone(&gate);
            let submitted = Arc::clone(&submitted);
            std::thread::spawn(move || {
                let mut executor = TileExecutor::new(workers, queue_factor).unwrap();
                for i in 0..10 {
                    let gate = Arc::clone(&gate);
                    executor
                        .submit(format!("job-{}", i), move || {
                            let _open = gate.read();
                            Ok::<(), String>(())
                        })
                        .unwrap();
                    submitted.fetch_add(1, Ordering::SeqCst);
                }
                executor.drain()
            })
        };

        std::thread::sleep(Duration::from_millis(300));
        // One job running plus a full backlog; the next submit is blocked
        assert_eq!(
            submitted.load(Ordering::SeqCst),
            workers + workers * queue_factor
        );

        drop(closed);
        let stats = producer.join().unwrap();
        assert_eq!(stats.succeeded, 10);
    }
}
