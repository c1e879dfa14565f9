//! In-memory cache: session-scoped storage that dies with the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::store::traits::LocalCache;

/// Session-scoped key/value store with an optional byte quota.
///
/// Usage is counted as key bytes plus value bytes, like browser storage
/// quotas.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that rejects writes past `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;

        if let Some(quota) = self.quota {
            // The entry being replaced does not count against the new write.
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let requested = key.len() + value.len();
            if used + requested > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    used,
                    requested,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty().await);

        cache.set("draft_stage_1", "{}").await.unwrap();
        assert_eq!(cache.get("draft_stage_1").await.unwrap().as_deref(), Some("{}"));
        assert!(!cache.is_empty().await);

        assert!(cache.remove("draft_stage_1").await.unwrap());
        assert!(!cache.remove("draft_stage_1").await.unwrap());
        assert!(cache.get("draft_stage_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn quota_rejects_oversized_write() {
        let cache = MemoryCache::with_quota(16);
        cache.set("a", "0123456789").await.unwrap();

        let err = cache.set("b", "0123456789").await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 16, .. }));
        assert!(cache.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn quota_ignores_replaced_entry() {
        let cache = MemoryCache::with_quota(12);
        cache.set("a", "0123456789").await.unwrap();
        // Overwriting the same key only needs room for the new value.
        cache.set("a", "9876543210").await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("9876543210"));
    }
}
