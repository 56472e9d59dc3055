//! Sliding-window rate limiter for outbound requests.
//!
//! Keeps the issue instant of every permit handed out during the last
//! window. A new permit is granted only while fewer than `max_per_window`
//! instants fall inside `(now - window, now]`, so no half-open window of
//! that length ever contains more than `max_per_window` permits. There is
//! no burst allowance on top of that.
//!
//! Waiters queue on a tokio mutex, which grants the lock in FIFO order;
//! the head of the queue sleeps until the oldest permit leaves the window.
//! The instant log itself is a `parking_lot` mutex held only while pruning
//! and pushing, never across a sleep.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::telemetry;

/// Authorisation to make one upstream call.
#[derive(Debug, Clone, Copy)]
#[must_use = "a permit is issued to make an upstream call"]
pub struct Permit {
    issued_at: Instant,
}

impl Permit {
    /// When the permit was issued.
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }
}

/// Caps permits at `max_per_window` per rolling `window`.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    max_per_window: NonZeroU32,
    window: Duration,
    issued: Mutex<VecDeque<Instant>>,
    queue: tokio::sync::Mutex<()>,
}

impl RateLimiter {
    /// Limit to `max_per_second` permits in any rolling one-second window.
    pub fn per_second(name: impl Into<String>, max_per_second: NonZeroU32) -> Self {
        Self::with_window(name, max_per_second, Duration::from_secs(1))
    }

    /// Limit to `max_per_window` permits in any rolling `window`.
    pub fn with_window(name: impl Into<String>, max_per_window: NonZeroU32, window: Duration) -> Self {
        Self {
            name: name.into(),
            max_per_window,
            window,
            issued: Mutex::new(VecDeque::with_capacity(max_per_window.get() as usize)),
            queue: tokio::sync::Mutex::new(()),
        }
    }

    /// Maximum permits per window.
    pub fn max_per_window(&self) -> u32 {
        self.max_per_window.get()
    }

    /// Length of the accounting window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for a permit.
    ///
    /// Suspends only the calling task. Callers are served roughly in arrival
    /// order; dropping the future gives up the place in the queue.
    pub async fn acquire(&self) -> Permit {
        let _turn = self.queue.lock().await;
        let mut waited = false;
        loop {
            match self.try_issue(Instant::now()) {
                Ok(permit) => return permit,
                Err(wait) => {
                    if !waited {
                        metrics::counter!(telemetry::RATE_LIMITED_TOTAL, "upstream" => self.name.clone())
                            .increment(1);
                        waited = true;
                    }
                    trace!(upstream = %self.name, wait_ms = wait.as_millis() as u64, "rate window full");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Take a permit if the window has room, without waiting.
    ///
    /// Does not respect the waiter queue; meant for probing.
    pub fn try_acquire(&self) -> Option<Permit> {
        self.try_issue(Instant::now()).ok()
    }

    /// Permits issued inside the current window.
    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        let mut issued = self.issued.lock();
        self.prune(&mut issued, now);
        issued.len()
    }

    /// Issue a permit at `now`, or report how long until one frees up.
    fn try_issue(&self, now: Instant) -> Result<Permit, Duration> {
        let mut issued = self.issued.lock();
        self.prune(&mut issued, now);
        if issued.len() < self.max_per_window.get() as usize {
            issued.push_back(now);
            return Ok(Permit { issued_at: now });
        }
        // Non-empty: the window is full.
        let oldest = issued.front().copied().unwrap_or(now);
        Err((oldest + self.window).saturating_duration_since(now))
    }

    fn prune(&self, issued: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = issued.front() {
            if now.duration_since(front) >= self.window {
                issued.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::per_second("test", NonZeroU32::new(max).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn try_issue_reports_time_until_oldest_expires() {
        let limiter = limiter(2);
        let start = Instant::now();
        assert!(limiter.try_issue(start).is_ok());
        assert!(limiter.try_issue(start + Duration::from_millis(300)).is_ok());

        let wait = limiter
            .try_issue(start + Duration::from_millis(400))
            .unwrap_err();
        assert_eq!(wait, Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn permits_leave_window_after_one_second() {
        let limiter = limiter(1);
        let start = Instant::now();
        assert!(limiter.try_issue(start).is_ok());
        assert!(limiter.try_issue(start + Duration::from_millis(999)).is_err());
        assert!(limiter.try_issue(start + Duration::from_secs(1)).is_ok());
    }
}
