//! Size-bounded, expiring in-process string cache.
//!
//! Used as tier 1 of the translation cache. A single `RwLock` guards the whole
//! map; reads take the shared lock and never evict.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently in the map, expired ones included.
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries removed by expiry sweeps or capacity eviction.
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone)]
struct LocalEntry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct BoundedLocalCache {
    entries: RwLock<HashMap<String, LocalEntry>>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BoundedLocalCache {
    pub const DEFAULT_CAPACITY: usize = 1000;
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates a cache holding at most `capacity` entries, each living `ttl`.
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            capacity,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = self
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone());

        let counter = if value.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Inserts or replaces `key`. When the map is full and `key` is new,
    /// expired entries go first, then the quarter of entries closest to expiry.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.entries.write();

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let evicted = Self::evict(&mut entries, self.capacity, now);
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }

        entries.insert(
            key,
            LocalEntry {
                value: value.into(),
                expires_at: now + self.ttl,
            },
        );
    }

    fn evict(entries: &mut HashMap<String, LocalEntry>, capacity: usize, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);

        if entries.len() >= capacity {
            let batch = (capacity / 4).max(1);
            let mut by_expiry: Vec<(Instant, String)> = entries
                .iter()
                .map(|(key, entry)| (entry.expires_at, key.clone()))
                .collect();
            by_expiry.sort_unstable();
            for (_, key) in by_expiry.into_iter().take(batch) {
                entries.remove(&key);
            }
        }

        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for BoundedLocalCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = BoundedLocalCache::new(10, Duration::from_secs(60));
        cache.set("k", "v");

        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.get("missing"), None);

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_hides_entry_without_evicting() {
        let cache = BoundedLocalCache::new(10, Duration::from_secs(30));
        cache.set("k", "v");
        assert!(cache.get("k").is_some());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.cleanup_expired(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_capacity_never_exceeded() {
        let cache = BoundedLocalCache::new(8, Duration::from_secs(60));
        for i in 0..=8 {
            cache.set(format!("k{i}"), "v");
            assert!(cache.len() <= 8);
        }
        assert!(cache.get("k8").is_some());
        assert_eq!(cache.stats().evictions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_removes_oldest_writes() {
        let cache = BoundedLocalCache::new(4, Duration::from_secs(60));
        for i in 0..4 {
            cache.set(format!("k{i}"), "v");
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        cache.set("k4", "v");
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get("k0"), None);
        assert!(cache.get("k1").is_some());
        assert!(cache.get("k4").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_prefers_expired_entries() {
        let cache = BoundedLocalCache::new(4, Duration::from_secs(10));
        cache.set("old", "v");
        tokio::time::advance(Duration::from_secs(11)).await;
        for i in 0..3 {
            cache.set(format!("k{i}"), "v");
        }

        cache.set("new", "v");
        assert_eq!(cache.len(), 4);
        for key in ["k0", "k1", "k2", "new"] {
            assert!(cache.get(key).is_some(), "{key} should survive");
        }
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache = BoundedLocalCache::new(2, Duration::from_secs(60));
        cache.set("a", "1");
        cache.set("b", "2");
        cache.set("a", "3");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").as_deref(), Some("3"));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let cache = BoundedLocalCache::default();
        cache.set("a", "1");
        cache.clear();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 1000);
    }

    #[test]
    fn test_hit_rate_calculation() {
        let stats = CacheStats {
            hits: 75,
            misses: 25,
            ..CacheStats::default()
        };
        assert!((stats.hit_rate() - 75.0).abs() < 0.001);
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }
}
