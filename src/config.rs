//! Subscription tuning knobs.

use std::time::Duration;

/// Default bound on items waiting for the consumer.
pub const DEFAULT_MAX_PENDING: usize = 10;

/// Default delay before retrying after a failed fetch.
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(10);

/// Settings for one single-source subscription.
///
/// ```
/// use std::time::Duration;
/// use feedsub::SubscribeConfig;
///
/// let config = SubscribeConfig::default()
///     .with_max_pending(32)
///     .with_failure_backoff(Duration::from_secs(30));
/// assert_eq!(config.max_pending, 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeConfig {
    /// Upper bound on the pending queue.  While it is full no fetch starts.
    /// Values below 1 are treated as 1.
    pub max_pending: usize,
    /// Fixed wait after every failed fetch.  There is no exponential growth.
    pub failure_backoff: Duration,
}

impl SubscribeConfig {
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    pub fn with_failure_backoff(mut self, failure_backoff: Duration) -> Self {
        self.failure_backoff = failure_backoff;
        self
    }
}

impl Default for SubscribeConfig {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
        }
    }
}
