//! Time source and settings for task polling.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Default delay between two `show-task` polls (in milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default ceiling for waiting on a task (in seconds)
pub const DEFAULT_POLL_CEILING_SECS: u64 = 600;

/// Source of time for polling and jittered waits.
///
/// Production code uses [`TokioClock`]; tests substitute a clock that advances instantly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How often and how long to poll a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between polls
    pub interval: Duration,

    /// Maximum time spent polling, measured from the start of the loop
    pub ceiling: Duration,
}

impl PollSettings {
    /// Create settings with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            ceiling: Duration::from_secs(DEFAULT_POLL_CEILING_SECS),
        }
    }

    /// Set the delay between polls.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the polling ceiling.
    #[must_use]
    pub const fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new()
    }
}
