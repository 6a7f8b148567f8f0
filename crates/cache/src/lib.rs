pub mod disk;
pub mod manager;
pub mod memory;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use disk::DiskCache;
pub use manager::CacheManager;
pub use memory::MemoryCache;

/// A cached value with its creation time and optional time-to-live.
/// Entries are never updated in place; a write replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub created_at: DateTime<Utc>,
    pub ttl: Option<u64>,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: Option<u64>) -> Self {
        Self {
            value,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// Lazy expiry check. Entries without a TTL never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => {
                let age = now.signed_duration_since(self.created_at);
                age.num_seconds() >= 0 && age.num_seconds() as u64 > ttl
            }
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = CacheEntry::new(serde_json::json!(1), None);
        let far_future = Utc::now() + Duration::days(3650);
        assert!(!entry.is_expired_at(far_future));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let entry = CacheEntry::new(serde_json::json!("v"), Some(300));
        assert!(!entry.is_expired_at(entry.created_at + Duration::seconds(300)));
        assert!(entry.is_expired_at(entry.created_at + Duration::seconds(301)));
    }
}
