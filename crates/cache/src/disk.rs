use chrono::{DateTime, TimeZone, Utc};
use dexter_core::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Tier-2 persistent cache backed by a single SQLite table.
/// All failures degrade to cache-miss semantics; nothing here is fatal.
pub struct DiskCache {
    conn: Arc<Mutex<Connection>>,
}

impl DiskCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| Error::Storage(format!("open cache db: {}", e)))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache (
                key_hash   TEXT PRIMARY KEY,
                key        TEXT NOT NULL,
                value      TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                ttl        INTEGER
            );",
        )
        .map_err(|e| Error::Storage(format!("init cache schema: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn hash_key(key: &str) -> String {
        let digest = Sha256::digest(key.as_bytes());
        format!("{:x}", digest)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let key_hash = Self::hash_key(key);
        let conn = self.conn.lock().ok()?;

        let row: Option<(String, i64, Option<i64>)> = conn
            .query_row(
                "SELECT value, created_at, ttl FROM cache WHERE key_hash = ?1",
                params![key_hash],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Cache read failed, treating as miss");
                None
            });

        let (raw_value, created_at, ttl) = row?;

        let created = Utc
            .timestamp_opt(created_at, 0)
            .single()
            .unwrap_or_else(Utc::now);
        if let Some(ttl) = ttl {
            let age = now.signed_duration_since(created).num_seconds();
            if age > ttl {
                let _ = conn.execute("DELETE FROM cache WHERE key_hash = ?1", params![key_hash]);
                return None;
            }
        }

        match serde_json::from_str::<Value>(&raw_value) {
            Ok(value) => Some(value),
            Err(e) => {
                // Corrupt entry: discard silently, treat as a miss.
                debug!(key, error = %e, "Discarding corrupt cache entry");
                let _ = conn.execute("DELETE FROM cache WHERE key_hash = ?1", params![key_hash]);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &Value, ttl: Option<u64>) {
        let key_hash = Self::hash_key(key);
        let raw = value.to_string();
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(_) => return,
        };
        if let Err(e) = conn.execute(
            "INSERT OR REPLACE INTO cache (key_hash, key, value, created_at, ttl)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key_hash,
                key,
                raw,
                Utc::now().timestamp(),
                ttl.map(|t| t as i64)
            ],
        ) {
            warn!(key, error = %e, "Cache persist failed, continuing without tier 2");
        }
    }

    pub fn delete(&self, key: &str) {
        let key_hash = Self::hash_key(key);
        if let Ok(conn) = self.conn.lock() {
            let _ = conn.execute("DELETE FROM cache WHERE key_hash = ?1", params![key_hash]);
        }
    }

    pub fn clear(&self) {
        if let Ok(conn) = self.conn.lock() {
            let _ = conn.execute("DELETE FROM cache", []);
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.conn
            .lock()
            .ok()
            .and_then(|conn| {
                conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get::<_, i64>(0))
                    .ok()
            })
            .unwrap_or(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite an entry's creation time. Only used by tests to simulate age.
    #[doc(hidden)]
    pub fn backdate(&self, key: &str, created_at: DateTime<Utc>) {
        let key_hash = Self::hash_key(key);
        if let Ok(conn) = self.conn.lock() {
            let _ = conn.execute(
                "UPDATE cache SET created_at = ?1 WHERE key_hash = ?2",
                params![created_at.timestamp(), key_hash],
            );
        }
    }

    /// Overwrite an entry's stored value with raw text. Only used by tests to
    /// simulate on-disk corruption.
    #[doc(hidden)]
    pub fn corrupt(&self, key: &str, raw: &str) {
        let key_hash = Self::hash_key(key);
        if let Ok(conn) = self.conn.lock() {
            let _ = conn.execute(
                "UPDATE cache SET value = ?1 WHERE key_hash = ?2",
                params![raw, key_hash],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn open_temp() -> (tempfile::TempDir, DiskCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(&dir.path().join("cache.db")).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_set_get_roundtrip() {
        let (_dir, cache) = open_temp();
        cache.set("financial:600519.SH:annual", &json!({"roe": 30.1}), Some(3600));
        assert_eq!(
            cache.get("financial:600519.SH:annual"),
            Some(json!({"roe": 30.1}))
        );
    }

    #[test]
    fn test_missing_key_is_none() {
        let (_dir, cache) = open_temp();
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn test_expired_entry_evicted() {
        let (_dir, cache) = open_temp();
        cache.set("k", &json!(1), Some(60));
        cache.backdate("k", Utc::now() - Duration::seconds(120));
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_entry_treated_as_miss() {
        let (_dir, cache) = open_temp();
        cache.set("k", &json!({"ok": true}), None);
        cache.corrupt("k", "{not valid json");
        assert!(cache.get("k").is_none());
        // And the corrupt row is gone.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_and_exists() {
        let (_dir, cache) = open_temp();
        cache.set("a", &json!(1), None);
        cache.set("b", &json!(2), None);
        assert!(cache.exists("a"));
        cache.clear();
        assert!(!cache.exists("a"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_single_key() {
        let (_dir, cache) = open_temp();
        cache.set("a", &json!(1), None);
        cache.set("b", &json!(2), None);
        cache.delete("a");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(json!(2)));
    }
}
