//! Bounded LRU + TTL cache of raw search results.
//!
//! [`ResultCache`] memoizes the *raw candidate set* returned for a
//! [`QueryKey`], never a resolved outcome: disambiguation hints can differ
//! between calls that share a key, so the decision is re-made on every
//! lookup.
//!
//! # Semantics
//!
//! - Keys are [`QueryKey`]s, which are normalized on construction exactly
//!   like batch deduplication.
//! - Each entry's expiry is fixed at insertion. Expired entries are removed
//!   lazily on the next `get` for that key, or in bulk by [`ResultCache::prune`].
//! - Inserting into a full cache first evicts the least-recently-used
//!   entry. `get` hits promote the entry to most-recently-used.
//! - Re-inserting an existing key replaces the entry wholesale with a new
//!   expiry at the most-recently-used position.
//!
//! Exact LRU order is required here, so the store is an [`lru::LruCache`]
//! behind a mutex rather than moka's approximate (TinyLFU) policy.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use tokio::time::Instant;

use crate::limiter::instant_after;
use crate::telemetry;
use crate::types::{Candidate, QueryKey};

/// Configuration for the result cache.
///
/// ```rust
/// # use muninn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000. Zero is treated as one.
    pub max_entries: usize,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
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
///
/// Counters are monotonic since creation; `size` is the live entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    /// Entries evicted by capacity pressure.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheMetrics {
    /// `hits / (hits + misses)`, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    candidates: Vec<Candidate>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe bounded cache of raw candidate sets.
pub struct ResultCache {
    entries: Mutex<LruCache<QueryKey, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up the candidates cached for `key`.
    ///
    /// Returns `None` on a miss. An expired entry counts as a miss and is
    /// removed. A hit promotes the entry to most-recently-used.
    pub fn get(&self, key: &QueryKey) -> Option<Vec<Candidate>> {
        let now = Instant::now();
        let mut entries = self.entries();

        match entries.peek(key).map(|entry| entry.is_expired(now)) {
            None => {
                drop(entries);
                self.record_miss();
                None
            }
            Some(true) => {
                entries.pop(key);
                drop(entries);
                self.expirations.fetch_add(1, Ordering::Relaxed);
                self.record_miss();
                None
            }
            Some(false) => {
                let candidates = entries.get(key).map(|entry| entry.candidates.clone());
                drop(entries);
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                candidates
            }
        }
    }

    /// Insert `candidates` under `key` with the configured TTL.
    pub fn set(&self, key: QueryKey, candidates: Vec<Candidate>) {
        self.set_with_ttl(key, candidates, self.ttl);
    }

    /// Insert `candidates` under `key`, expiring after `ttl`.
    pub fn set_with_ttl(&self, key: QueryKey, candidates: Vec<Candidate>, ttl: Duration) {
        let entry = CacheEntry {
            candidates,
            expires_at: instant_after(Instant::now(), ttl),
        };
        let mut entries = self.entries();

        // Replacing a key re-inserts it fresh; only a new key can displace
        // another entry.
        let replaced = entries.pop(&key).is_some();
        let evicted = if !replaced && entries.len() >= entries.cap().get() {
            entries.pop_lru().is_some()
        } else {
            false
        };
        entries.put(key, entry);
        drop(entries);

        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
        }
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let expired: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        drop(entries);

        let removed = expired.len();
        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Evict all entries. Counters are kept.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of entries currently stored (expired entries included until
    /// they are observed).
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of counters and size.
    pub fn metrics(&self) -> CacheMetrics {
        let (size, capacity) = {
            let entries = self.entries();
            (entries.len(), entries.cap().get())
        };
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size,
            capacity,
        }
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
    }
}
