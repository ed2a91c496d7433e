//! Result cache.
//!
//! An LRU-bounded, TTL-expiring cache from a compiled query's serialized
//! SPARQL text to the endpoint's decoded result. Mutations never consult
//! or populate this cache; callers are expected to evict or simply let
//! entries age out after a write, since this crate has no subscription
//! mechanism to invalidate proactively.

use crate::endpoint::SparqlJsonResult;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CachedEntry {
    value: SparqlJsonResult,
    inserted_at: Instant,
}

/// A thread-safe, bounded, TTL-expiring cache of query results.
///
/// # Examples
///
/// ```rust
/// use sparqlgrapher::cache::ResultCache;
/// use std::time::Duration;
///
/// let cache = ResultCache::new(1000, Duration::from_millis(300_000));
/// assert_eq!(cache.size(), 0);
/// assert_eq!(cache.capacity(), 1000);
/// ```
pub struct ResultCache {
    inner: Mutex<LruCache<String, CachedEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl ResultCache {
    /// Builds a cache holding at most `max_entries` results, each valid
    /// for `ttl` after insertion. `max_entries` of `0` degrades to a
    /// cache that never retains anything (`NonZeroUsize` floors at 1, so
    /// `put` immediately evicts the prior single entry on every call).
    pub fn new(max_entries: usize, ttl: Duration) -> ResultCache {
        let capacity = max_entries.max(1);
        ResultCache {
            inner: Mutex::new(LruCache::new(NonZeroUsize::new(capacity).unwrap())),
            capacity,
            ttl,
        }
    }

    /// Returns the cached result for `key`, unless it is absent or has
    /// aged past the configured TTL (in which case it is evicted and
    /// `None` is returned).
    pub fn get(&self, key: &str) -> Option<SparqlJsonResult> {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let expired = match guard.peek(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            guard.pop(key);
            return None;
        }
        guard.get(key).map(|entry| entry.value.clone())
    }

    /// Inserts or replaces the cached result for `key`, stamped with the
    /// current time.
    pub fn put(&self, key: String, value: SparqlJsonResult) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        guard.put(
            key,
            CachedEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        guard.clear();
    }

    /// Current number of entries, expired or not.
    pub fn size(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
