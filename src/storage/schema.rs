use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StorageError;

// ============================================================================
// Database
// ============================================================================

/// Handle to the entry store. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a bounded connection pool.
    ///
    /// `url` is either a `sqlite:` connection string or a bare file path;
    /// `:memory:` gives a private in-memory store shared by the pool's
    /// connections. Missing database files are created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connect` if the store cannot be reached.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let url = connection_url(url);

        // busy_timeout=5000: concurrent feed-write sessions wait for the
        // single SQLite writer instead of failing with SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StorageError::Connect)?
            .create_if_missing(true)
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        tracing::debug!(max_connections = max_connections, "Opened storage pool");
        Ok(Self { pool })
    }

    /// Create the `feeds` table and its unique id index if missing.
    ///
    /// Both statements use `IF NOT EXISTS` and run in one transaction, so
    /// calling this at the start of every run is a no-op on an existing
    /// store. The transaction's connection goes back to the pool when it
    /// commits or is dropped.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Schema)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                title TEXT,
                description TEXT,
                link TEXT,
                id TEXT,
                author TEXT,
                published TEXT,
                updated TEXT,
                category TEXT,
                content_type TEXT,
                content_value TEXT,
                comments TEXT,
                source TEXT,
                contributors TEXT,
                rights TEXT,
                attachments TEXT
            )
        "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Schema)?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_feeds_id ON feeds (id)")
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Schema)?;

        tx.commit().await.map_err(StorageError::Schema)?;
        tracing::debug!("Storage schema ready");
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn connection_url(url: &str) -> String {
    if url.starts_with("sqlite:") {
        url.to_string()
    } else {
        format!("sqlite:{}", url)
    }
}
