//! Retry budget and exponential backoff for batch operations.

use std::time::Duration;

/// Default number of retries before a batch gives up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default upper bound for a single wait.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Retry state of one batch call sequence.
///
/// Batch operations take it by `&mut`, so one instance drives one sequence at a time.
/// It only counts and waits; deciding whether a failure is retryable is up to the caller.
///
/// ```rust
/// use dynamodb_exec::retry::FailConfig;
/// use std::time::Duration;
///
/// let fail_config = FailConfig::new(3, Duration::from_millis(50))
///     .with_max_delay(Duration::from_secs(1));
/// assert_eq!(fail_config.max_retries(), 3);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FailConfig {
    retry_count: u32,
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for FailConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

impl FailConfig {
    /// A fresh budget of `max_retries` waits starting at `base_delay`.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            retry_count: 0,
            max_retries,
            base_delay,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Caps every single wait at `max_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Retries performed since the last reset.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// The retry budget.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The wait the next call to [`Self::exponential_backoff`] will take.
    pub fn next_delay(&self) -> Duration {
        let factor = 2u32.saturating_pow(self.retry_count);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Sleeps for [`Self::next_delay`], then counts one retry.
    pub async fn exponential_backoff(&mut self) {
        let delay = self.next_delay();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            retry_count = self.retry_count,
            max_retries = self.max_retries,
            delay_ms = delay.as_millis() as u64,
            "backing off before retry"
        );
        tokio::time::sleep(delay).await;
        self.retry_count += 1;
    }

    /// Whether the budget is spent.
    pub fn max_retries_reached(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Starts a new budget.
    pub fn reset(&mut self) {
        self.retry_count = 0;
    }
}
