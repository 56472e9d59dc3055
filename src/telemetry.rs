//! Telemetry metric name constants.
//!
//! Centralised metric names for gateway operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `pypi_gateway_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `upstream`: upstream API name ("pypi", "osv")
//! - `operation`: fetch operation (e.g. "package_info", "vulnerabilities")
//! - `status`: attempt outcome, "ok" or "error"

/// Total result-cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "pypi_gateway_cache_hits_total";

/// Total result-cache misses.
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "pypi_gateway_cache_misses_total";

/// Total entries removed from the result cache.
///
/// Labels: `reason` ("capacity" | "expired").
pub const CACHE_EVICTIONS_TOTAL: &str = "pypi_gateway_cache_evictions_total";

/// Total upstream attempts (each retry counts).
///
/// Labels: `upstream`, `operation`, `status` ("ok" | "error").
pub const UPSTREAM_REQUESTS_TOTAL: &str = "pypi_gateway_upstream_requests_total";

/// Upstream attempt duration in seconds.
///
/// Labels: `upstream`, `operation`.
pub const UPSTREAM_DURATION_SECONDS: &str = "pypi_gateway_upstream_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `upstream`, `operation`.
pub const RETRIES_TOTAL: &str = "pypi_gateway_retries_total";

/// Total permits that had to wait for the rate window to open.
///
/// Labels: `upstream`.
pub const RATE_LIMITED_TOTAL: &str = "pypi_gateway_rate_limited_total";

/// Total resolves that joined a fetch already in flight.
///
/// Labels: `operation`.
pub const SINGLE_FLIGHT_JOINS_TOTAL: &str = "pypi_gateway_single_flight_joins_total";
