//! Retry policy for fetch pipelines.
//!
//! Only the coordinator retries; sources classify errors and fail fast.
//! Backoff grows linearly with the attempt count: a rate-limited provider
//! gets progressively more breathing room without the long tail of an
//! exponential schedule on small retry budgets.

use std::time::Duration;

/// Default total attempts per artifact.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Cap on a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry policy applied by the coordinator to transient fetch failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per artifact (not retries after the first attempt):
    /// a value of 3 means at most 3 fetch calls and 2 backoff sleeps.
    pub max_retries: u32,
    /// Base delay; attempt `n` sleeps `n * retry_delay`.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; a zero attempt budget is clamped to one attempt.
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    /// Backoff to sleep after the given 1-based failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(attempt.max(1))
            .min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}
