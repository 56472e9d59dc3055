//! Request governor: outbound rate limiting plus bounded retry.
//!
//! A [`Governor`] guards one upstream API. Every attempt it makes, retries
//! included, first takes a [`Permit`] from its [`RateLimiter`] and then runs
//! under a per-attempt timeout. Outcomes follow a small state machine:
//!
//! ```text
//! PENDING ──ok──────────────────────────────► DONE
//!    │
//!    ├─ transient, retries left ─► BACKOFF ─► PENDING
//!    ├─ transient, none left ────────────────► FAILED (Exhausted)
//!    └─ permanent ───────────────────────────► FAILED (error as-is)
//! ```
//!
//! Retry exhaustion surfaces as [`GatewayError::Exhausted`] wrapping the last
//! transient error, so callers can tell a flaky upstream apart from a request
//! that failed on its first and only attempt.

pub mod rate;
pub mod retry;

pub use rate::{Permit, RateLimiter};
pub use retry::RetryConfig;

use std::future::Future;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::telemetry;
use crate::{GatewayError, Result};

const DEFAULT_MAX_RATE: NonZeroU32 = NonZeroU32::new(10).unwrap();

/// Settings for a single [`Governor`].
///
/// ```rust
/// # use pypi_gateway::governor::{GovernorConfig, RetryConfig};
/// # use std::num::NonZeroU32;
/// # use std::time::Duration;
/// let config = GovernorConfig::new()
///     .max_rate(NonZeroU32::new(20).unwrap())
///     .attempt_timeout(Duration::from_secs(5))
///     .retry(RetryConfig::new().max_retries(2));
/// ```
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Sustained permits per second. Default: 10.
    pub max_rate: NonZeroU32,
    /// Timeout applied to each attempt. Default: 30s.
    pub attempt_timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_rate: DEFAULT_MAX_RATE,
            attempt_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

impl GovernorConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sustained request rate.
    pub fn max_rate(mut self, per_second: NonZeroU32) -> Self {
        self.max_rate = per_second;
        self
    }

    /// Set the per-attempt timeout.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Rate limit and retry policy for one upstream.
#[derive(Debug)]
pub struct Governor {
    upstream: String,
    limiter: RateLimiter,
    retry: RetryConfig,
    attempt_timeout: Duration,
}

impl Governor {
    /// Create a governor for the named upstream.
    pub fn new(upstream: impl Into<String>, config: GovernorConfig) -> Self {
        let upstream = upstream.into();
        Self {
            limiter: RateLimiter::per_second(upstream.clone(), config.max_rate),
            upstream,
            retry: config.retry,
            attempt_timeout: config.attempt_timeout,
        }
    }

    /// Name of the guarded upstream.
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// The underlying rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The retry policy in effect.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Wait for permission to make one upstream call.
    pub async fn acquire(&self) -> Permit {
        self.limiter.acquire().await
    }

    /// Run `attempt` under the rate limit, retrying transient failures.
    ///
    /// `attempt` is invoked once per try and must build a fresh future each
    /// time. Permanent errors return immediately; after `max_retries`
    /// transient failures the last one comes back wrapped in
    /// [`GatewayError::Exhausted`].
    pub async fn execute_with_retry<F, Fut, T>(&self, operation: &str, attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_described(operation, operation, attempt).await
    }

    /// Like [`Governor::execute_with_retry`], but timeouts and exhaustion
    /// name the call by `description` (say `package_info(name=flask)`).
    /// `operation` stays the metric label.
    pub async fn execute_described<F, Fut, T>(
        &self,
        operation: &str,
        description: &str,
        mut attempt: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.retry.max_attempts();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let _permit = self.acquire().await;
            let start = Instant::now();
            let outcome = match tokio::time::timeout(self.attempt_timeout, attempt()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GatewayError::Timeout {
                    operation: description.to_owned(),
                    after: self.attempt_timeout,
                }),
            };
            self.record_attempt(operation, start, outcome.is_ok());

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            if attempts >= max_attempts {
                warn!(
                    upstream = %self.upstream,
                    request = description,
                    attempts,
                    error = %err,
                    "giving up after transient errors"
                );
                return Err(GatewayError::Exhausted {
                    operation: description.to_owned(),
                    attempts,
                    last: Box::new(err),
                });
            }

            let delay = self.retry.effective_delay(attempts - 1, err.retry_after());
            metrics::counter!(telemetry::RETRIES_TOTAL,
                "upstream" => self.upstream.clone(),
                "operation" => operation.to_owned(),
            )
            .increment(1);
            warn!(
                upstream = %self.upstream,
                request = description,
                attempt = attempts,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after transient error"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Record attempt outcome metrics (counter + histogram).
    fn record_attempt(&self, operation: &str, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
            "upstream" => self.upstream.clone(),
            "operation" => operation.to_owned(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::UPSTREAM_DURATION_SECONDS,
            "upstream" => self.upstream.clone(),
            "operation" => operation.to_owned(),
        )
        .record(start.elapsed().as_secs_f64());
    }
}
