//! Client configuration types.

use std::time::Duration;

/// Status codes treated as transient
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [500, 502, 503, 504, 403];

/// Retry configuration for failed requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Base of the exponential backoff
    pub backoff_factor: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// HTTP statuses that trigger a retry
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_millis(300),
            max_backoff: Duration::from_secs(120),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }

    /// Set maximum retries
    #[must_use]
    pub const fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the backoff factor
    #[must_use]
    pub const fn backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set maximum backoff duration
    #[must_use]
    pub const fn max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Replace the set of retryable statuses
    #[must_use]
    pub fn retry_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_statuses = statuses.into_iter().collect();
        self
    }

    /// Total number of requests the policy allows
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether a response status should be retried
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Calculate the delay before the given retry (1-based).
    ///
    /// The first retry goes out immediately, later ones wait
    /// `backoff_factor * 2^(retry - 1)`, capped at `max_backoff`.
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let factor = u64::try_from(self.backoff_factor.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);
        let backoff = 2u64
            .checked_pow(retry - 1)
            .and_then(|mult| factor.checked_mul(mult))
            .unwrap_or(u64::MAX);
        Duration::from_millis(backoff.min(max))
    }
}
