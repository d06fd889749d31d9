use sqlx::FromRow;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage failures, split by the point in a run where they matter.
///
/// `Connect` and `Schema` are fatal for a run. `Acquire` fails one feed's
/// write session. `Serialize` and `Write` fail a single entry.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open storage: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Schema setup failed: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("Failed to acquire storage connection: {0}")]
    Acquire(#[source] sqlx::Error),

    #[error("Failed to serialize entry {id}: {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write entry {id}: {source}")]
    Write {
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Storage query failed: {0}")]
    Query(#[from] sqlx::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

/// Outcome of one feed-write session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreReport {
    /// New rows written
    pub inserted: usize,
    /// Entries whose id already existed; left untouched
    pub duplicates: usize,
    /// Entries that could not be written
    pub failed: usize,
}

impl StoreReport {
    pub fn attempted(&self) -> usize {
        self.inserted + self.duplicates + self.failed
    }
}

/// A persisted `feeds` row, exactly as stored.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub content_value: Option<String>,
    pub comments: Option<String>,
    pub source: Option<String>,
    pub contributors: Option<String>,
    pub rights: Option<String>,
    pub attachments: Option<String>,
}
