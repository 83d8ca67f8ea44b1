//! The sharded cache store.
//!
//! Entries are spread across N independently locked maps chosen by key
//! hash, so concurrent requests for unrelated keys never contend. Each
//! entry remembers its insertion instant; a read past the caller's
//! staleness bound both misses and evicts.

use std::{
    collections::HashMap,
    hash::{DefaultHasher, Hash, Hasher},
    sync::Mutex,
    time::Instant,
};

use tracing::debug;

use crate::key::CacheKey;

const DEFAULT_SHARD_COUNT: usize = 16;

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

// ============================================================================
// ResultCache
// ============================================================================

/// A staleness-bounded cache over cloneable values.
///
/// There is no background sweeper; expired entries are reclaimed lazily
/// when a read observes them, or wholesale via [`ResultCache::clear`].
/// Staleness is the reader's choice per lookup, not a property of the
/// entry, so two callers with different tolerances share one store.
#[derive(Debug)]
pub struct ResultCache<T> {
    shards: Vec<Mutex<HashMap<CacheKey, Entry<T>>>>,
}

impl<T: Clone> ResultCache<T> {
    /// Creates a cache with the given shard count (minimum one).
    pub fn with_shards(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    /// Looks up `key`, treating anything older than `max_staleness_ms` as
    /// absent. An expired entry is evicted on the spot.
    pub fn get(&self, key: &CacheKey, max_staleness_ms: u64) -> Option<T> {
        self.get_at(key, max_staleness_ms, Instant::now())
    }

    /// Clock-injected variant of [`ResultCache::get`].
    pub fn get_at(&self, key: &CacheKey, max_staleness_ms: u64, now: Instant) -> Option<T> {
        let mut shard = self.shard_for(key).lock().expect("cache shard lock poisoned");
        let Some(entry) = shard.get(key) else {
            debug!(key = %key, "cache miss");
            return None;
        };

        let age_ms = now.duration_since(entry.inserted_at).as_millis();
        if age_ms > u128::from(max_staleness_ms) {
            shard.remove(key);
            debug!(key = %key, age_ms, "cache entry expired");
            return None;
        }

        debug!(key = %key, age_ms, "cache hit");
        Some(entry.value.clone())
    }

    /// Stores `value` under `key`, overwriting any prior entry.
    pub fn put(&self, key: CacheKey, value: T) {
        self.put_at(key, value, Instant::now());
    }

    /// Clock-injected variant of [`ResultCache::put`].
    pub fn put_at(&self, key: CacheKey, value: T, now: Instant) {
        let mut shard = self.shard_for(&key).lock().expect("cache shard lock poisoned");
        shard.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Removes one entry, if present.
    pub fn invalidate(&self, key: &CacheKey) {
        self.shard_for(key)
            .lock()
            .expect("cache shard lock poisoned")
            .remove(key);
    }

    /// Drops every entry in every shard.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().expect("cache shard lock poisoned").clear();
        }
    }

    /// Current entry count across all shards. Includes entries that have
    /// aged out but not yet been read.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().expect("cache shard lock poisoned").len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard_for(&self, key: &CacheKey) -> &Mutex<HashMap<CacheKey, Entry<T>>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }
}

impl<T: Clone> Default for ResultCache<T> {
    fn default() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use garnet_types::{TenantId, UserId};

    use super::*;

    fn key(query: &str) -> CacheKey {
        CacheKey::for_query(&TenantId::new("tenant1"), &UserId::new("john_doe"), query)
    }

    #[test]
    fn test_get_within_staleness_bound_hits() {
        let cache = ResultCache::default();
        let now = Instant::now();
        cache.put_at(key("q1"), vec![1, 2, 3], now);

        let later = now + Duration::from_millis(500);
        assert_eq!(cache.get_at(&key("q1"), 1000, later), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_get_past_staleness_bound_misses_and_evicts() {
        let cache = ResultCache::default();
        let now = Instant::now();
        cache.put_at(key("q1"), vec![1], now);

        let later = now + Duration::from_millis(1500);
        assert_eq!(cache.get_at(&key("q1"), 1000, later), None);
        // Evicted: a fresh read with an infinite tolerance still misses.
        assert_eq!(cache.get_at(&key("q1"), u64::MAX, later), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_exact_boundary_age_still_hits() {
        let cache = ResultCache::default();
        let now = Instant::now();
        cache.put_at(key("q1"), "rows".to_string(), now);

        let boundary = now + Duration::from_millis(1000);
        assert!(cache.get_at(&key("q1"), 1000, boundary).is_some());
    }

    #[test]
    fn test_put_overwrites_value_and_age() {
        let cache = ResultCache::default();
        let start = Instant::now();
        cache.put_at(key("q1"), 1u32, start);

        // Re-inserting later restarts the clock for the entry.
        let later = start + Duration::from_millis(900);
        cache.put_at(key("q1"), 2u32, later);
        assert_eq!(cache.get_at(&key("q1"), 500, later + Duration::from_millis(400)), Some(2));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = ResultCache::default();
        let now = Instant::now();
        cache.put_at(key("q1"), 1u32, now);
        cache.put_at(key("q2"), 2u32, now);

        cache.invalidate(&key("q1"));
        assert_eq!(cache.get_at(&key("q1"), 1000, now), None);
        assert_eq!(cache.get_at(&key("q2"), 1000, now), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_staleness_tolerates_only_same_instant_reads() {
        let cache = ResultCache::default();
        let now = Instant::now();
        cache.put_at(key("q1"), 1u32, now);

        assert_eq!(cache.get_at(&key("q1"), 0, now), Some(1));
        assert_eq!(cache.get_at(&key("q1"), 0, now + Duration::from_millis(1)), None);
    }

    #[test]
    fn test_single_shard_still_works() {
        let cache = ResultCache::with_shards(1);
        let now = Instant::now();
        for index in 0..32u32 {
            cache.put_at(key(&format!("q{index}")), index, now);
        }
        assert_eq!(cache.len(), 32);
        assert_eq!(cache.get_at(&key("q7"), 1000, now), Some(7));
    }

    #[test]
    fn test_concurrent_puts_land_in_consistent_state() {
        use std::sync::Arc;

        let cache = Arc::new(ResultCache::with_shards(8));
        let handles: Vec<_> = (0..4)
            .map(|thread| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for index in 0..50u32 {
                        cache.put(key(&format!("t{thread}-q{index}")), index);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("cache writer thread panicked");
        }

        assert_eq!(cache.len(), 200);
    }
}
