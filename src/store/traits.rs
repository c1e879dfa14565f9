//! `LocalCache` trait: the key/value contract the engine persists through.

use async_trait::async_trait;

use crate::error::StorageError;

/// Backend-agnostic key/value string store.
///
/// Mirrors browser local/session storage: string keys, string values, no
/// transactions. Writers race last-write-wins.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Read a value, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}
