//! Generic expiring cache.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;
use switchyard_core::Duration;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries dropped for age
    pub evictions: u64,
}

/// A value and when it was stored
#[derive(Debug, Clone)]
pub struct CachedEntry<V> {
    value: V,
    created_at: Instant,
}

impl<V> CachedEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            created_at: Instant::now(),
        }
    }

    /// Stored value
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Whether the entry is older than `ttl`
    pub fn is_expired(&self, now: Instant, ttl: std::time::Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}

/// Key-value store whose entries expire after a fixed lifetime.
///
/// Expired entries are evicted lazily on every `get`, or explicitly with
/// `clean`. Not synchronized; wrap in a lock to share.
#[derive(Debug, Clone)]
pub struct ExpiringCache<K, V> {
    entries: HashMap<K, CachedEntry<V>>,
    ttl: std::time::Duration,
    stats: CacheStats,
}

impl<K: Eq + Hash, V: Clone> ExpiringCache<K, V> {
    /// Create a cache with the given entry lifetime
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: ttl.into(),
            stats: CacheStats::default(),
        }
    }

    /// Entry lifetime
    pub fn ttl(&self) -> std::time::Duration {
        self.ttl
    }

    /// Live value for `key`. Evicts every expired entry first.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.clean();
        let value = self.entries.get(key).map(|e| e.value.clone());
        if value.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        value
    }

    /// Store `value`, returning the previous value if one was live
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let now = Instant::now();
        let ttl = self.ttl;
        self.entries
            .insert(key, CachedEntry::new(value))
            .filter(|old| !old.is_expired(now, ttl))
            .map(|old| old.value)
    }

    /// Remove `key`
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether `key` holds a live entry
    pub fn contains_key(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|e| !e.is_expired(now, self.ttl))
    }

    /// Evict expired entries, returning how many were dropped
    pub fn clean(&mut self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now, ttl));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            self.stats.evictions += evicted as u64;
            tracing::debug!(evicted, "expired cache entries removed");
        }
        evicted
    }

    /// Number of stored entries, expired ones included until cleaned
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit, miss, and eviction counts
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl<K: Eq + Hash, V: Clone> Default for ExpiringCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
