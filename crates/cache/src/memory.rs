use chrono::{DateTime, Utc};
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;

use crate::CacheEntry;

/// Tier-1 in-process cache with least-recently-used eviction.
/// Reads and writes both promote the entry to most-recently-used.
pub struct MemoryCache {
    entries: LruCache<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new(max_size: usize) -> Self {
        let cap = NonZeroUsize::new(max_size.max(1)).expect("max(1) is non-zero");
        Self {
            entries: LruCache::new(cap),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    /// Expiry is evaluated against `now` so tests can simulate the clock.
    pub fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => return None,
        };
        if expired {
            self.entries.pop(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn set(&mut self, key: &str, value: Value, ttl: Option<u64>) {
        self.entries.put(key.to_string(), CacheEntry::new(value, ttl));
    }

    pub fn delete(&mut self, key: &str) {
        self.entries.pop(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_set_then_get() {
        let mut cache = MemoryCache::new(10);
        cache.set("realtime:600519.SH", json!({"price": 1600.0}), Some(300));
        assert_eq!(
            cache.get("realtime:600519.SH"),
            Some(json!({"price": 1600.0}))
        );
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut cache = MemoryCache::new(3);
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), None);
        cache.set("c", json!(3), None);
        // Touch "a" so "b" becomes the least recently used.
        assert!(cache.get("a").is_some());
        cache.set("d", json!(4), None);

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_fill_to_capacity_plus_one_evicts_exactly_one() {
        let mut cache = MemoryCache::new(4);
        for i in 0..5 {
            cache.set(&format!("k{}", i), json!(i), None);
        }
        assert_eq!(cache.len(), 4);
        assert!(cache.get("k0").is_none());
        for i in 1..5 {
            assert!(cache.get(&format!("k{}", i)).is_some());
        }
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let mut cache = MemoryCache::new(10);
        cache.set("k", json!("v"), Some(60));
        let later = Utc::now() + Duration::seconds(61);
        assert!(cache.get_at("k", later).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_overwrite_replaces_wholesale() {
        let mut cache = MemoryCache::new(10);
        cache.set("k", json!({"a": 1}), Some(60));
        cache.set("k", json!({"b": 2}), None);
        assert_eq!(cache.get("k"), Some(json!({"b": 2})));
        assert_eq!(cache.len(), 1);
    }
}
