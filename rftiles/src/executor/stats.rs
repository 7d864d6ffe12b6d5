//! Executor statistics.

/// Maximum number of individual failures retained for reporting.
const MAX_RECORDED_FAILURES: usize = 64;

/// A job that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// Label given at submission.
    pub label: String,
    /// Error or panic message.
    pub reason: String,
}

/// Counters accumulated over the executor's lifetime.
#[derive(Debug, Clone, Default)]
pub struct ExecutorStats {
    /// Jobs accepted by `submit`.
    pub submitted: u64,
    /// Jobs that returned `Ok`.
    pub succeeded: u64,
    /// Jobs that returned `Err`.
    pub failed: u64,
    /// Jobs that panicked.
    pub panicked: u64,
    failures: Vec<JobFailure>,
}

impl ExecutorStats {
    /// Jobs that finished, successfully or not.
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.panicked
    }

    /// True if no job failed or panicked.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.panicked == 0
    }

    /// The first failures, in completion order.
    pub fn failures(&self) -> &[JobFailure] {
        &self.failures
    }

    pub(crate) fn push_failure(&mut self, failure: JobFailure) {
        if self.failures.len() < MAX_RECORDED_FAILURES {
            self.failures.push(failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_and_clean() {
        let mut stats = ExecutorStats {
            submitted: 5,
            succeeded: 4,
            ..Default::default()
        };
        assert!(stats.is_clean());
        stats.failed = 1;
        assert_eq!(stats.completed(), 5);
        assert!(!stats.is_clean());
    }

    #[test]
    fn test_failure_list_is_capped() {
        let mut stats = ExecutorStats::default();
        for i in 0..(MAX_RECORDED_FAILURES + 10) {
            stats.push_failure(JobFailure {
                label: i.to_string(),
                reason: "x".to_string(),
            });
        }
        assert_eq!(stats.failures().len(), MAX_RECORDED_FAILURES);
        assert_eq!(stats.failures()[0].label, "0");
    }
}
