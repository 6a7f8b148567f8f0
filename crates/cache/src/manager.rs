use chrono::{DateTime, Utc};
use dexter_core::config::CacheConfig;
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::{DiskCache, MemoryCache};

/// Two-tier cache keyed by `category:symbol[:period]`.
///
/// Tier 1 is an in-process LRU; tier 2 is the SQLite store. Every write goes
/// to both tiers; a tier-1 miss consults tier 2 and re-populates tier 1 on a
/// hit. When the tier-2 store cannot be opened the manager degrades to
/// tier-1-only semantics.
pub struct CacheManager {
    enabled: bool,
    memory: Mutex<MemoryCache>,
    disk: Option<DiskCache>,
    config: CacheConfig,
}

impl CacheManager {
    pub fn new(config: &CacheConfig, db_path: &Path) -> Self {
        let disk = match DiskCache::open(db_path) {
            Ok(disk) => Some(disk),
            Err(e) => {
                warn!(error = %e, "Tier-2 cache unavailable, running in-memory only");
                None
            }
        };
        Self {
            enabled: config.enabled,
            memory: Mutex::new(MemoryCache::new(config.max_size)),
            disk,
            config: config.clone(),
        }
    }

    /// An in-memory-only manager, used by tests and by `--no-cache` runs.
    pub fn memory_only(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            memory: Mutex::new(MemoryCache::new(config.max_size)),
            disk: None,
            config: config.clone(),
        }
    }

    fn make_key(category: &str, symbol: &str, period: Option<&str>) -> String {
        match period {
            Some(period) => format!("{}:{}:{}", category, symbol, period),
            None => format!("{}:{}", category, symbol),
        }
    }

    fn ttl_for(&self, category: &str) -> Option<u64> {
        match category {
            "realtime" => Some(self.config.ttl_realtime),
            "financial" => Some(self.config.ttl_financial),
            "historical" => Some(self.config.ttl_historical),
            "analysis" => Some(self.config.ttl_analysis),
            _ => None,
        }
    }

    pub fn get(&self, category: &str, symbol: &str, period: Option<&str>) -> Option<Value> {
        self.get_at(category, symbol, period, Utc::now())
    }

    pub fn get_at(
        &self,
        category: &str,
        symbol: &str,
        period: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        let key = Self::make_key(category, symbol, period);

        if let Ok(mut memory) = self.memory.lock() {
            if let Some(value) = memory.get_at(&key, now) {
                debug!(key, "Cache hit (memory)");
                return Some(value);
            }
        }

        if let Some(disk) = &self.disk {
            if let Some(value) = disk.get_at(&key, now) {
                debug!(key, "Cache hit (disk)");
                if let Ok(mut memory) = self.memory.lock() {
                    memory.set(&key, value.clone(), self.ttl_for(category));
                }
                return Some(value);
            }
        }

        None
    }

    pub fn set(&self, category: &str, symbol: &str, period: Option<&str>, value: Value) {
        if !self.enabled {
            return;
        }
        let key = Self::make_key(category, symbol, period);
        let ttl = self.ttl_for(category);

        if let Some(disk) = &self.disk {
            disk.set(&key, &value, ttl);
        }
        if let Ok(mut memory) = self.memory.lock() {
            memory.set(&key, value, ttl);
        }
    }

    pub fn delete(&self, category: &str, symbol: &str, period: Option<&str>) {
        let key = Self::make_key(category, symbol, period);
        if let Ok(mut memory) = self.memory.lock() {
            memory.delete(&key);
        }
        if let Some(disk) = &self.disk {
            disk.delete(&key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut memory) = self.memory.lock() {
            memory.clear();
        }
        if let Some(disk) = &self.disk {
            disk.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.enabled,
            memory_entries: self.memory.lock().map(|m| m.len()).unwrap_or(0),
            disk_entries: self.disk.as_ref().map(|d| d.len()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub enabled: bool,
    pub memory_entries: usize,
    pub disk_entries: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn test_config() -> CacheConfig {
        CacheConfig {
            enabled: true,
            max_size: 8,
            ttl_realtime: 300,
            ttl_financial: 3600,
            ttl_historical: 86_400,
            ttl_analysis: 86_400,
        }
    }

    #[test]
    fn test_set_get_idempotent() {
        let cache = CacheManager::memory_only(&test_config());
        cache.set("analysis", "600519.SH", None, json!("report text"));
        assert_eq!(
            cache.get("analysis", "600519.SH", None),
            Some(json!("report text"))
        );
        // Immediately again: unchanged.
        assert_eq!(
            cache.get("analysis", "600519.SH", None),
            Some(json!("report text"))
        );
    }

    #[test]
    fn test_period_distinguishes_keys() {
        let cache = CacheManager::memory_only(&test_config());
        cache.set("financial", "600519.SH", Some("annual"), json!(1));
        cache.set("financial", "600519.SH", Some("quarterly"), json!(2));
        assert_eq!(
            cache.get("financial", "600519.SH", Some("annual")),
            Some(json!(1))
        );
        assert_eq!(
            cache.get("financial", "600519.SH", Some("quarterly")),
            Some(json!(2))
        );
    }

    #[test]
    fn test_ttl_elapsed_is_a_miss() {
        let cache = CacheManager::memory_only(&test_config());
        cache.set("realtime", "600519.SH", None, json!({"price": 1600.0}));
        let later = Utc::now() + Duration::seconds(301);
        assert!(cache.get_at("realtime", "600519.SH", None, later).is_none());
    }

    #[test]
    fn test_disabled_cache_always_misses() {
        let mut config = test_config();
        config.enabled = false;
        let cache = CacheManager::memory_only(&config);
        cache.set("analysis", "600519.SH", None, json!("x"));
        assert!(cache.get("analysis", "600519.SH", None).is_none());
    }

    #[test]
    fn test_disk_hit_repopulates_memory() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cache.db");
        let cache = CacheManager::new(&test_config(), &db);
        cache.set("financial", "00700.HK", Some("annual"), json!({"rows": 3}));

        // A fresh manager over the same db has a cold tier 1.
        let cache2 = CacheManager::new(&test_config(), &db);
        assert_eq!(cache2.stats().memory_entries, 0);
        assert_eq!(
            cache2.get("financial", "00700.HK", Some("annual")),
            Some(json!({"rows": 3}))
        );
        assert_eq!(cache2.stats().memory_entries, 1);
    }

    #[test]
    fn test_unwritable_disk_degrades_to_memory_only() {
        // A path under a file (not a directory) cannot be created.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let cache = CacheManager::new(&test_config(), &blocker.join("sub").join("cache.db"));

        cache.set("analysis", "600519.SH", None, json!("still works"));
        assert_eq!(
            cache.get("analysis", "600519.SH", None),
            Some(json!("still works"))
        );
        assert!(cache.stats().disk_entries.is_none());
    }

    #[test]
    fn test_clear_empties_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(&test_config(), &dir.path().join("cache.db"));
        cache.set("realtime", "a", None, json!(1));
        cache.set("realtime", "b", None, json!(2));
        cache.clear();
        assert!(cache.get("realtime", "a", None).is_none());
        let stats = cache.stats();
        assert_eq!(stats.memory_entries, 0);
        assert_eq!(stats.disk_entries, Some(0));
    }
}
