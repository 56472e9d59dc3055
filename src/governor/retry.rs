//! Retry configuration and delay calculation.

use std::time::Duration;

/// Configuration for retry behaviour on transient errors.
///
/// Uses capped exponential backoff without jitter, so successive delays
/// never shrink:
///
/// ```rust
/// # use pypi_gateway::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(200));
/// assert_eq!(config.delay_for_retry(2), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt. 0 = no retry. Default: 3.
    pub max_retries: u32,
    /// Delay before the first retry. Default: 250ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 10s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of retries after the first attempt.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before retry number `retry` (0-indexed).
    ///
    /// `initial_delay * 2^retry`, capped at `max_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(retry));
        delay.min(self.max_delay)
    }

    /// Backoff that also honours an upstream `retry_after` hint.
    ///
    /// The hint lengthens the wait but never shortens it below the backoff,
    /// and `max_delay` caps the result either way.
    pub fn effective_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.delay_for_retry(retry);
        retry_after.map_or(backoff, |hint| hint.max(backoff).min(self.max_delay))
    }
}
