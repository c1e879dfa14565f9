//! libSQL backend: durable `LocalCache` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use tracing::info;

use crate::error::StorageError;
use crate::store::schema;
use crate::store::traits::LocalCache;

/// libSQL-backed cache over a single reused connection.
///
/// The connection owns its SQLite handle, so the `Database` it came from is
/// not kept. For `:memory:` this single connection is the whole database.
pub struct LibSqlCache {
    conn: Connection,
}

impl LibSqlCache {
    /// Open (or create) a local database file and check its schema.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Backend(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to open libSQL database: {e}")))?;

        let cache = Self::from_database(db).await?;
        info!(path = %path.display(), "Local cache opened");
        Ok(cache)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StorageError::Backend(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self, StorageError> {
        let conn = db
            .connect()
            .map_err(|e| StorageError::Backend(format!("Failed to create connection: {e}")))?;
        schema::ensure_schema(&conn).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl LocalCache for LibSqlCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let read_err = |e: libsql::Error| StorageError::ReadFailed {
            key: key.to_string(),
            reason: e.to_string(),
        };

        let mut rows = self
            .conn
            .query("SELECT value FROM local_storage WHERE key = ?1", params![key])
            .await
            .map_err(read_err)?;

        match rows.next().await.map_err(read_err)? {
            Some(row) => Ok(Some(row.get::<String>(0).map_err(read_err)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let count = self
            .conn
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(count > 0)
    }
}
