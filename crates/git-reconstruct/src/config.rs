use std::time::Duration;

use crate::RetryPolicy;

/// Settings for a reconstruction run.
#[derive(Debug, Clone)]
pub struct ReconstructConfig {
    /// Number of worker threads; at most this many tasks are in flight.
    pub jobs: usize,
    /// Retries for fetches that fail transiently.
    pub fetch_retry: RetryPolicy,
    /// Retries for writes that fail on resource exhaustion (descriptor limits).
    pub write_retry: RetryPolicy,
    /// Largest inflated object accepted, in bytes.
    pub max_object_size: u64,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            jobs: Self::DEFAULT_JOBS,
            fetch_retry: RetryPolicy::new(4, Duration::from_millis(200))
                .with_max_delay(Duration::from_secs(5)),
            write_retry: RetryPolicy::new(5, Duration::from_millis(50))
                .with_max_delay(Duration::from_secs(1)),
            max_object_size: git_loose::ContentExtractor::DEFAULT_LIMIT,
        }
    }
}

impl ReconstructConfig {
    pub const DEFAULT_JOBS: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count. Zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_fetch_retry(mut self, policy: RetryPolicy) -> Self {
        self.fetch_retry = policy;
        self
    }

    pub fn with_write_retry(mut self, policy: RetryPolicy) -> Self {
        self.write_retry = policy;
        self
    }

    pub fn with_max_object_size(mut self, limit: u64) -> Self {
        self.max_object_size = limit;
        self
    }
}
