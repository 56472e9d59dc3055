use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use pypi_gateway::governor::{Governor, GovernorConfig};
use pypi_gateway::{ErrorKind, GatewayError, Result, RetryConfig};
use tokio::time::Instant;

/// Upstream stand-in that fails N times then succeeds.
struct FailThenSucceed {
    fail_count: AtomicU32,
    fail_with: fn() -> GatewayError,
    total_calls: AtomicU32,
}

impl FailThenSucceed {
    fn new(failures: u32, fail_with: fn() -> GatewayError) -> Arc<Self> {
        Arc::new(Self {
            fail_count: AtomicU32::new(failures),
            fail_with,
            total_calls: AtomicU32::new(0),
        })
    }

    fn always(fail_with: fn() -> GatewayError) -> Arc<Self> {
        Self::new(u32::MAX, fail_with)
    }

    async fn call(&self) -> Result<&'static str> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let remaining = self.fail_count.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_count.fetch_sub(1, Ordering::Relaxed);
            return Err((self.fail_with)());
        }
        Ok("ok")
    }

    fn call_count(&self) -> u32 {
        self.total_calls.load(Ordering::Relaxed)
    }
}

fn server_error() -> GatewayError {
    GatewayError::Api {
        status: 503,
        message: "503 Service Unavailable".into(),
    }
}

fn governor(max_retries: u32) -> Governor {
    Governor::new(
        "test",
        GovernorConfig::new().retry(
            RetryConfig::new()
                .max_retries(max_retries)
                .initial_delay(Duration::from_millis(10)),
        ),
    )
}

async fn run(governor: &Governor, upstream: &Arc<FailThenSucceed>) -> Result<&'static str> {
    governor
        .execute_with_retry("package_info", || upstream.call())
        .await
}

#[tokio::test(start_paused = true)]
async fn success_needs_one_attempt() {
    let upstream = FailThenSucceed::new(0, server_error);
    assert_eq!(run(&governor(3), &upstream).await.unwrap(), "ok");
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_until_success() {
    let upstream = FailThenSucceed::new(2, server_error);
    assert_eq!(run(&governor(3), &upstream).await.unwrap(), "ok");
    assert_eq!(upstream.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn persistent_transient_failure_is_exhausted() {
    let upstream = FailThenSucceed::always(server_error);
    let err = run(&governor(3), &upstream).await.unwrap_err();

    assert_eq!(upstream.call_count(), 4, "max_retries + 1 attempts");
    assert_eq!(err.kind(), ErrorKind::Exhausted);
    match err {
        GatewayError::Exhausted {
            operation,
            attempts,
            last,
        } => {
            assert_eq!(operation, "package_info");
            assert_eq!(attempts, 4);
            assert!(matches!(*last, GatewayError::Api { status: 503, .. }));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn exhausted_is_not_retried_again() {
    let err = GatewayError::Exhausted {
        operation: "op".into(),
        attempts: 2,
        last: Box::new(server_error()),
    };
    assert!(!err.is_transient());
}

#[tokio::test(start_paused = true)]
async fn not_found_is_attempted_once() {
    let upstream = FailThenSucceed::always(|| GatewayError::NotFound("package 'nope' not found on PyPI".into()));
    let err = run(&governor(3), &upstream).await.unwrap_err();
    assert_eq!(upstream.call_count(), 1);
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn client_error_is_attempted_once() {
    let upstream = FailThenSucceed::always(|| GatewayError::Api {
        status: 400,
        message: "400 Bad Request".into(),
    });
    let err = run(&governor(3), &upstream).await.unwrap_err();
    assert_eq!(upstream.call_count(), 1);
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test(start_paused = true)]
async fn zero_retries_surfaces_exhausted_after_one_attempt() {
    let upstream = FailThenSucceed::always(|| GatewayError::Http("connection reset".into()));
    let err = run(&governor(0), &upstream).await.unwrap_err();
    assert_eq!(upstream.call_count(), 1);
    assert_eq!(err.kind(), ErrorKind::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_between_attempts() {
    let governor = Governor::new(
        "test",
        GovernorConfig::new().retry(
            RetryConfig::new()
                .max_retries(3)
                .initial_delay(Duration::from_millis(100)),
        ),
    );
    let upstream = FailThenSucceed::always(server_error);

    let start = Instant::now();
    let _ = run(&governor, &upstream).await;
    let elapsed = start.elapsed();

    // 100ms + 200ms + 400ms of backoff.
    assert!(elapsed >= Duration::from_millis(700), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(800), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn retry_after_hint_lengthens_backoff() {
    let upstream = FailThenSucceed::new(1, || GatewayError::RateLimited {
        retry_after: Some(Duration::from_secs(2)),
    });

    let start = Instant::now();
    assert!(run(&governor(3), &upstream).await.is_ok());
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(upstream.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_attempt_times_out_and_is_retried() {
    let governor = Governor::new(
        "test",
        GovernorConfig::new()
            .attempt_timeout(Duration::from_secs(1))
            .retry(RetryConfig::new().max_retries(1).initial_delay(Duration::from_millis(10))),
    );
    let calls = AtomicU32::new(0);
    let counter = &calls;

    let err = governor
        .execute_with_retry("package_info", || async move {
            let calls = counter;
            calls.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, GatewayError>(())
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::Relaxed), 2);
    match err {
        GatewayError::Exhausted { last, .. } => {
            assert!(matches!(*last, GatewayError::Timeout { .. }), "{last:?}")
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn every_attempt_takes_a_rate_permit() {
    let governor = Governor::new(
        "test",
        GovernorConfig::new()
            .max_rate(std::num::NonZeroU32::new(2).unwrap())
            .retry(RetryConfig::new().max_retries(4).initial_delay(Duration::from_millis(1))),
    );
    let upstream = FailThenSucceed::always(server_error);

    let start = Instant::now();
    let _ = run(&governor, &upstream).await;

    // Five attempts at two per second cannot finish inside two seconds.
    assert_eq!(upstream.call_count(), 5);
    assert!(start.elapsed() >= Duration::from_secs(2));
}

fn long_retry_after() -> GatewayError {
    GatewayError::RateLimited {
        retry_after: Some(Duration::from_secs(86_400)),
    }
}

#[tokio::test(start_paused = true)]
async fn retry_after_hint_never_exceeds_max_delay() {
    let governor = Governor::new(
        "test",
        GovernorConfig::new().retry(
            RetryConfig::new()
                .max_retries(1)
                .initial_delay(Duration::from_millis(10))
                .max_delay(Duration::from_millis(100)),
        ),
    );
    let upstream = FailThenSucceed::new(1, long_retry_after);

    let start = Instant::now();
    assert_eq!(run(&governor, &upstream).await.unwrap(), "ok");

    assert_eq!(upstream.call_count(), 2);
    assert!(start.elapsed() < Duration::from_secs(1), "{:?}", start.elapsed());
}

#[tokio::test(start_paused = true)]
async fn described_calls_name_the_request_in_errors() {
    let upstream = FailThenSucceed::always(server_error);
    let err = governor(1)
        .execute_described("package_info", "package_info(name=flaky)", || upstream.call())
        .await
        .unwrap_err();

    match &err {
        GatewayError::Exhausted { operation, attempts, .. } => {
            assert_eq!(operation, "package_info(name=flaky)");
            assert_eq!(*attempts, 2);
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
    assert!(err.to_string().contains("flaky"), "{err}");
}
