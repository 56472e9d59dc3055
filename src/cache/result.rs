//! In-memory result cache for upstream fetches.
//!
//! [`ResultCache`] stores the outcome of a successful fetch under its
//! [`CacheKey`] and serves it until the entry's TTL elapses. Two independent
//! pressures remove entries:
//!
//! - **TTL expiry**: an entry older than the configured TTL is never returned
//!   as a hit. Expired entries are dropped lazily on access, and purged
//!   eagerly before a capacity eviction so a stale entry is always preferred
//!   as the victim over a live one.
//! - **LRU eviction**: inserting a new key into a full cache evicts the least
//!   recently touched live entry. Both hits and writes count as a touch.
//!
//! # Concurrency
//!
//! The entry map sits behind a single `parking_lot` mutex that is only held
//! for the in-memory update; no lock is ever held across an `.await`. The
//! hit/miss counters are atomics outside the lock.
//!
//! # Clock
//!
//! Timestamps come from [`tokio::time::Instant`], so tests running on a
//! paused runtime can step through expiry deterministically. Outside a
//! runtime it falls back to the system monotonic clock.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use super::CacheKey;
use crate::telemetry;

/// Configuration for the result cache.
///
/// ```rust
/// # use pypi_gateway::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries. Default: 1,000. Zero is treated as one.
    pub max_entries: usize,
    /// Time-to-live for cached entries. Default: 5 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or `0.0` before the first lookup.
    pub hit_rate: f64,
    pub current_size: usize,
    pub max_size: usize,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// LRU + TTL cache of fetch results, generic over the stored value.
///
/// The cache never inspects values; it only clones them out on a hit.
pub struct ResultCache<V> {
    entries: Mutex<LruCache<CacheKey, CacheEntry<V>>>,
    ttl: Duration,
    capacity: NonZeroUsize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ResultCache<V> {
    /// Create an empty cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a live value.
    ///
    /// Every call counts exactly one hit or one miss. A hit marks the entry
    /// as most recently used; an expired entry is removed and counts as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        let found = {
            let mut entries = self.entries.lock();
            let lookup = entries
                .get(key)
                .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
            match lookup {
                Some(Some(value)) => Some(value),
                Some(None) => {
                    entries.pop(key);
                    record_eviction("expired");
                    None
                }
                None => None,
            }
        };

        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => key.operation().to_owned())
                    .increment(1);
                debug!(key = %key, "cache hit");
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => key.operation().to_owned())
                    .increment(1);
                debug!(key = %key, "cache miss");
                None
            }
        }
    }

    /// Read a live value without touching recency or the hit/miss counters.
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        self.entries
            .lock()
            .peek(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Insert or overwrite the value for `key` with a fresh expiry.
    ///
    /// Overwriting keeps the entry count unchanged. Inserting a new key into
    /// a full cache first drops expired entries, then, if still full, evicts
    /// the least recently used live entry.
    pub fn put(&self, key: CacheKey, value: V) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut entries = self.entries.lock();
        if !entries.contains(&key) && entries.len() >= self.capacity.get() {
            purge_expired(&mut entries, now);
        }
        if let Some((evicted, old)) = entries.push(key.clone(), entry) {
            // `push` hands back the previous value when overwriting the same key.
            if evicted != key {
                record_eviction("capacity");
                debug!(
                    key = %evicted,
                    age_ms = now.duration_since(old.created_at).as_millis() as u64,
                    "evicted least recently used entry"
                );
            }
        }
    }

    /// Remove a single entry. Returns whether a live entry was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .pop(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Drop every entry. Counters are left untouched.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        purge_expired(&mut entries, now);
        entries.len()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Snapshot of the hit/miss counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            current_size: self.len(),
            max_size: self.capacity.get(),
        }
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

fn purge_expired<V>(entries: &mut LruCache<CacheKey, CacheEntry<V>>, now: Instant) {
    let expired: Vec<CacheKey> = entries
        .iter()
        .filter(|(_, entry)| !entry.is_live(now))
        .map(|(key, _)| key.clone())
        .collect();
    for key in expired {
        entries.pop(&key);
        record_eviction("expired");
    }
}

fn record_eviction(reason: &'static str) {
    metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => reason).increment(1);
}
