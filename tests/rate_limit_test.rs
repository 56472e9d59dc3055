//! Rolling-window rate limiter: ceiling, waiting and queue order.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pypi_gateway::governor::RateLimiter;
use tokio::time::Instant;
use tokio_test::{assert_pending, assert_ready};

fn limiter(max: u32) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::per_second("test", NonZeroU32::new(max).unwrap()))
}

#[tokio::test(start_paused = true)]
async fn permits_within_rate_are_immediate() {
    let limiter = limiter(3);
    let start = Instant::now();
    for _ in 0..3 {
        let permit = limiter.acquire().await;
        assert_eq!(permit.issued_at(), start);
    }
    assert_eq!(limiter.in_window(), 3);
}

#[tokio::test(start_paused = true)]
async fn excess_permit_waits_for_next_window() {
    let limiter = limiter(3);
    let start = Instant::now();
    for _ in 0..3 {
        let _ = limiter.acquire().await;
    }

    let permit = limiter.acquire().await;
    assert_eq!(permit.issued_at() - start, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn acquire_is_pending_while_window_is_full() {
    let limiter = limiter(1);
    let _ = limiter.acquire().await;

    let mut waiter = tokio_test::task::spawn(limiter.acquire());
    assert_pending!(waiter.poll());

    tokio::time::advance(Duration::from_millis(500)).await;
    assert_pending!(waiter.poll());

    tokio::time::advance(Duration::from_millis(500)).await;
    let permit = assert_ready!(waiter.poll());
    assert_eq!(permit.issued_at(), Instant::now());
}

#[tokio::test(start_paused = true)]
async fn try_acquire_never_exceeds_rate() {
    let limiter = limiter(2);
    assert!(limiter.try_acquire().is_some());
    assert!(limiter.try_acquire().is_some());
    assert!(limiter.try_acquire().is_none());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(limiter.try_acquire().is_some());
}

#[tokio::test(start_paused = true)]
async fn no_rolling_window_exceeds_the_ceiling() {
    let max = 5usize;
    let limiter = limiter(max as u32);
    let issued = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..23 {
        let limiter = Arc::clone(&limiter);
        let issued = Arc::clone(&issued);
        handles.push(tokio::spawn(async move {
            let permit = limiter.acquire().await;
            issued.lock().push(permit.issued_at());
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut issued = issued.lock().clone();
    assert_eq!(issued.len(), 23);
    issued.sort();
    for window in issued.windows(max + 1) {
        let span = window[max] - window[0];
        assert!(
            span >= Duration::from_secs(1),
            "{} permits issued within {span:?}",
            max + 1
        );
    }
    // 23 permits at 5/s need at least four full windows after the first burst.
    assert!(issued[22] - issued[0] >= Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn waiters_are_served_in_arrival_order() {
    let limiter = limiter(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..5 {
        let limiter = Arc::clone(&limiter);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let _permit = limiter.acquire().await;
            order.lock().push(i);
        }));
        // Let the task reach the queue before spawning the next one.
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn dropped_waiter_gives_up_its_place() {
    let limiter = limiter(1);
    let _ = limiter.acquire().await;

    let mut abandoned = tokio_test::task::spawn(limiter.acquire());
    assert_pending!(abandoned.poll());
    drop(abandoned);

    let start = Instant::now();
    let permit = limiter.acquire().await;
    assert_eq!(permit.issued_at() - start, Duration::from_secs(1));
    assert_eq!(limiter.in_window(), 1);
}
