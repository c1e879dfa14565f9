//! Schema of the libSQL local cache.
//!
//! The cache is one key/value table. Its layout version is kept in SQLite's
//! `user_version` header; a file written by a newer build is refused instead
//! of being reinterpreted.

use libsql::Connection;
use tracing::{debug, info};

use crate::error::StorageError;

/// Layout version this build reads and writes.
pub const SCHEMA_VERSION: i64 = 1;

const LOCAL_STORAGE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS local_storage (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// Create the cache table on a fresh file, or check an existing one.
pub async fn ensure_schema(conn: &Connection) -> Result<(), StorageError> {
    let found = user_version(conn).await?;

    if found == SCHEMA_VERSION {
        debug!(version = found, "Local cache schema up to date");
        return Ok(());
    }
    if found > SCHEMA_VERSION {
        return Err(StorageError::Schema(format!(
            "local cache was written by schema v{found}, this build supports v{SCHEMA_VERSION}"
        )));
    }

    conn.execute_batch(LOCAL_STORAGE_TABLE)
        .await
        .map_err(|e| StorageError::Schema(format!("Failed to create local_storage: {e}")))?;
    conn.execute(&format!("PRAGMA user_version = {SCHEMA_VERSION}"), ())
        .await
        .map_err(|e| StorageError::Schema(format!("Failed to record schema version: {e}")))?;

    info!(version = SCHEMA_VERSION, "Local cache schema created");
    Ok(())
}

async fn user_version(conn: &Connection) -> Result<i64, StorageError> {
    let read_err =
        |e: libsql::Error| StorageError::Schema(format!("Failed to read user_version: {e}"));

    let mut rows = conn.query("PRAGMA user_version", ()).await.map_err(read_err)?;
    match rows.next().await.map_err(read_err)? {
        Some(row) => row.get::<i64>(0).map_err(read_err),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn blank_conn() -> Connection {
        libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap()
    }

    #[tokio::test]
    async fn fresh_database_gets_table_and_version() {
        let conn = blank_conn().await;
        assert_eq!(user_version(&conn).await.unwrap(), 0);

        ensure_schema(&conn).await.unwrap();

        assert_eq!(user_version(&conn).await.unwrap(), SCHEMA_VERSION);
        conn.execute(
            "INSERT INTO local_storage (key, value, updated_at) VALUES ('auth_token', 't', 'now')",
            (),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn existing_rows_survive_a_second_check() {
        let conn = blank_conn().await;
        ensure_schema(&conn).await.unwrap();
        conn.execute(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
            libsql::params!["draft_stage_1", "{}", "now"],
        )
        .await
        .unwrap();

        ensure_schema(&conn).await.unwrap();

        let mut rows = conn.query("SELECT COUNT(*) FROM local_storage", ()).await.unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn newer_layout_is_refused() {
        let conn = blank_conn().await;
        conn.execute("PRAGMA user_version = 7", ()).await.unwrap();

        let err = ensure_schema(&conn).await.unwrap_err();
        assert!(matches!(err, StorageError::Schema(ref m) if m.contains("v7")));
    }
}
