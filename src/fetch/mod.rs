//! Fetch orchestration: cache lookup, single-flight de-duplication and
//! governed upstream calls.
//!
//! [`Fetcher::resolve`] is the one entry point the tool layer uses:
//!
//! ```text
//! resolve(request)
//!      │ cache_key()
//!      ▼
//!  ResultCache::get ──hit──► value
//!      │ miss
//!      ▼
//!  in-flight registry ──already fetching──► await shared outcome
//!      │ not in flight
//!      ▼
//!  spawn: Governor::execute_with_retry(upstream.fetch)
//!         ok  → ResultCache::put
//!         either way → clear in-flight entry, wake every waiter
//! ```
//!
//! # Single-flight
//!
//! At most one upstream fetch per cache key is outstanding at a time.
//! Concurrent resolvers of the same key share one [`Shared`] future and all
//! observe the same `Ok`/`Err`. The fetch itself runs on a spawned task, so
//! dropping any (or every) waiter never cancels it; a fetch nobody awaits
//! anymore still lands in the cache.
//!
//! The registry is a `parking_lot` mutex held only to look up or insert the
//! shared future, never across an `.await`, and work on one key never waits
//! on another key's fetch.

pub mod request;

pub use request::{FetchRequest, normalize_package_name, ops};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheKey, ResultCache};
use crate::governor::Governor;
use crate::telemetry;
use crate::{GatewayError, Result};

/// An upstream API the fetcher can call.
///
/// Implementations perform exactly one attempt per call; retries, rate
/// limiting and caching are the fetcher's job.
#[async_trait]
pub trait Upstream: Send + Sync + 'static {
    /// Value produced by a successful fetch.
    type Value: Clone + Send + Sync + 'static;

    /// Upstream name (used for logging and metrics).
    fn name(&self) -> &str;

    /// Perform a single fetch attempt.
    async fn fetch(&self, request: &FetchRequest) -> Result<Self::Value>;
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

/// Composes a [`ResultCache`], a [`Governor`] and an [`Upstream`].
///
/// Cheap to clone; clones share all state.
pub struct Fetcher<U: Upstream> {
    inner: Arc<FetcherInner<U>>,
}

struct FetcherInner<U: Upstream> {
    upstream: U,
    cache: Arc<ResultCache<U::Value>>,
    governor: Arc<Governor>,
    in_flight: Mutex<HashMap<CacheKey, SharedFetch<U::Value>>>,
}

impl<U: Upstream> Clone for Fetcher<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U: Upstream> Fetcher<U> {
    /// Create a fetcher over the given collaborators.
    ///
    /// The cache may be shared with other fetchers; keys stay disjoint as
    /// long as operation names differ.
    pub fn new(upstream: U, cache: Arc<ResultCache<U::Value>>, governor: Arc<Governor>) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                upstream,
                cache,
                governor,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The wrapped upstream.
    pub fn upstream(&self) -> &U {
        &self.inner.upstream
    }

    /// The result cache.
    pub fn cache(&self) -> &Arc<ResultCache<U::Value>> {
        &self.inner.cache
    }

    /// The governor guarding the upstream.
    pub fn governor(&self) -> &Arc<Governor> {
        &self.inner.governor
    }

    /// Number of keys with a fetch currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Return the cached value for `request`, fetching it on a miss.
    ///
    /// Cache statistics count the first lookup only. A resolver that misses
    /// and then finds a value another fetch stored just before it took the
    /// registry lock returns that value with a miss already recorded.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn resolve(&self, request: FetchRequest) -> Result<U::Value> {
        let key = request.cache_key()?;
        if let Some(value) = self.inner.cache.get(&key) {
            return Ok(value);
        }
        self.join_or_start(key, request).await
    }

    /// Hand back the outstanding fetch for `key`, starting one if needed.
    fn join_or_start(&self, key: CacheKey, request: FetchRequest) -> SharedFetch<U::Value> {
        let mut in_flight = self.inner.in_flight.lock();

        if let Some(existing) = in_flight.get(&key) {
            metrics::counter!(telemetry::SINGLE_FLIGHT_JOINS_TOTAL, "operation" => key.operation().to_owned())
                .increment(1);
            debug!(key = %key, "joining in-flight fetch");
            return existing.clone();
        }

        // A fetch may have finished between the cache miss and taking the lock.
        if let Some(value) = self.inner.cache.peek(&key) {
            return futures_util::future::ready(Ok(value)).boxed().shared();
        }

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move { inner.fetch_and_store(task_key, request).await });
        let operation = key.operation().to_owned();
        let fetch = async move {
            handle.await.unwrap_or_else(|e| {
                Err(GatewayError::Internal(format!(
                    "{operation} fetch task failed: {e}"
                )))
            })
        }
        .boxed()
        .shared();

        in_flight.insert(key, fetch.clone());
        fetch
    }
}

impl<U: Upstream> FetcherInner<U> {
    async fn fetch_and_store(self: Arc<Self>, key: CacheKey, request: FetchRequest) -> Result<U::Value> {
        // Dropped after the put below: a later resolver sees either the
        // cached value or this fetch, never neither. Also clears the entry
        // if the upstream panics.
        let _registration = InFlightRegistration {
            in_flight: &self.in_flight,
            key: &key,
        };

        let description = request.describe();
        debug!(upstream = self.upstream.name(), request = %description, "fetching from upstream");
        let result = self
            .governor
            .execute_described(request.operation(), &description, || self.upstream.fetch(&request))
            .await;

        if let Ok(value) = &result {
            self.cache.put(key.clone(), value.clone());
        }
        result
    }
}

/// Removes a key from the in-flight registry when dropped.
struct InFlightRegistration<'a, V> {
    in_flight: &'a Mutex<HashMap<CacheKey, SharedFetch<V>>>,
    key: &'a CacheKey,
}

impl<V> Drop for InFlightRegistration<'_, V> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(self.key);
    }
}
