//! In-memory TTL cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Cache entry. `ttl: None` never expires.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Default TTL in seconds
    pub default_ttl_seconds: u64,
}

impl CacheConfig {
    /// Config with the given default TTL and the default capacity.
    pub fn with_ttl_seconds(default_ttl_seconds: u64) -> Self {
        Self {
            default_ttl_seconds,
            ..Self::default()
        }
    }

    /// Sets the capacity.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_seconds: 10,
        }
    }
}

/// String-keyed cache with read-time expiry.
///
/// Expired entries are never actively evicted: a read simply treats them as
/// absent. When an insert finds the cache full, expired entries are swept
/// first and then the oldest entry is dropped.
///
/// Thread-safe. Locks are held only for the duration of a single call.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    config: CacheConfig,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Gets a live value.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read();
        entries.get(key).and_then(|e| {
            if e.is_expired() {
                None
            } else {
                Some(e.value.clone())
            }
        })
    }

    /// Caches a value with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let ttl = Duration::from_secs(self.config.default_ttl_seconds);
        self.insert(key.into(), value, Some(ttl));
    }

    /// Caches a value with a custom TTL.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert(key.into(), value, Some(ttl));
    }

    /// Caches a value that never expires. It can still be evicted for space.
    pub fn set_permanent(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, None);
    }

    fn insert(&self, key: String, value: V, ttl: Option<Duration>) {
        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            entries.retain(|_, e| !e.is_expired());

            if entries.len() >= self.config.max_entries {
                if let Some(oldest_key) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest_key);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Removes a cached entry.
    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes all expired entries.
    pub fn cleanup_expired(&self) {
        self.entries.write().retain(|_, e| !e.is_expired());
    }

    /// Returns the number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| e.is_expired()).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
            capacity: self.config.max_entries,
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.read().len())
            .field("config", &self.config)
            .finish()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub valid_entries: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_cache_set_get() {
        let cache = TtlCache::new();
        cache.set("0xabc-0-100", vec![1u8, 2, 3]);
        assert_eq!(cache.get("0xabc-0-100"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_cache_keys_are_exact() {
        let cache = TtlCache::new();
        cache.set("Key", 1u32);
        assert!(cache.get("key").is_none());
        assert_eq!(cache.get("Key"), Some(1));
    }

    #[test]
    fn test_cache_miss() {
        let cache: TtlCache<u32> = TtlCache::new();
        assert!(cache.get("nonexistent").is_none());
    }

    #[test]
    fn test_cache_overwrite() {
        let cache = TtlCache::new();
        cache.set("k", 1u32);
        cache.set("k", 2u32);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_remove_and_clear() {
        let cache = TtlCache::new();
        cache.set("a", 1u32);
        cache.set("b", 2u32);
        cache.remove("a");
        assert!(cache.get("a").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test_case(Duration::from_millis(1), true ; "short ttl expires")]
    #[test_case(Duration::from_secs(3600), false ; "long ttl survives")]
    #[test_case(Duration::ZERO, true ; "zero ttl is never served")]
    fn test_cache_ttl(ttl: Duration, expired: bool) {
        let cache = TtlCache::new();
        cache.set_with_ttl("k", 7u32, ttl);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get("k").is_none(), expired);
    }

    #[test]
    fn test_expired_entries_are_not_evicted_on_read() {
        let cache = TtlCache::new();
        cache.set_with_ttl("k", 7u32, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expired_entries, 1);
    }

    #[test]
    fn test_permanent_entries_never_expire() {
        let cache = TtlCache::with_config(CacheConfig::with_ttl_seconds(0));
        cache.set_permanent("sender", 9u32);
        cache.set("log", 1u32);
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get("sender"), Some(9));
        assert!(cache.get("log").is_none());
    }

    #[test]
    fn test_cache_capacity_eviction_drops_oldest() {
        let cache = TtlCache::with_config(CacheConfig::default().max_entries(2));
        cache.set("a", 1u32);
        std::thread::sleep(Duration::from_millis(2));
        cache.set("b", 2u32);
        std::thread::sleep(Duration::from_millis(2));
        cache.set("c", 3u32);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_full_cache_sweeps_expired_first() {
        let cache = TtlCache::with_config(CacheConfig::default().max_entries(2));
        cache.set("keep", 1u32);
        cache.set_with_ttl("stale", 2u32, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        cache.set("new", 3u32);

        assert_eq!(cache.get("keep"), Some(1));
        assert_eq!(cache.get("new"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_stats() {
        let cache = TtlCache::with_config(CacheConfig::default().max_entries(8));
        cache.set("a", 1u32);
        cache.set("b", 2u32);
        let stats = cache.stats();
        assert_eq!(
            stats,
            CacheStats {
                total_entries: 2,
                expired_entries: 0,
                valid_entries: 2,
                capacity: 8,
            }
        );
    }

    #[test]
    fn test_cache_cleanup_expired() {
        let cache = TtlCache::new();
        cache.set_with_ttl("a", 1u32, Duration::from_millis(1));
        cache.set("b", 2u32);
        std::thread::sleep(Duration::from_millis(10));
        cache.cleanup_expired();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }
}
