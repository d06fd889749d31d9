use sqlx::{Executor, Sqlite};

use super::schema::Database;
use super::types::{StorageError, StoreReport, StoredEntry};
use crate::feed::FeedEntry;

const INSERT_ENTRY: &str = r#"
    INSERT INTO feeds (
        title, description, link, id, author, published, updated,
        category, content_type, content_value, comments, source,
        contributors, rights, attachments
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (id) DO NOTHING
"#;

/// JSON forms of the structured entry fields.
struct SerializedFields {
    category: String,
    source: Option<String>,
    contributors: String,
    rights: Option<String>,
    attachments: String,
}

impl SerializedFields {
    fn from_entry(entry: &FeedEntry) -> Result<Self, StorageError> {
        let err = |source| StorageError::Serialize {
            id: entry.id.clone(),
            source,
        };

        Ok(Self {
            category: serde_json::to_string(&entry.categories).map_err(err)?,
            source: entry
                .source
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(err)?,
            contributors: serde_json::to_string(&entry.contributors).map_err(err)?,
            rights: entry
                .rights
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(err)?,
            attachments: serde_json::to_string(&entry.attachments).map_err(err)?,
        })
    }
}

/// Insert one entry unless its id is already stored.
///
/// Returns `true` when a row was written, `false` on an id conflict.
async fn insert_entry<'e, E>(executor: E, entry: &FeedEntry) -> Result<bool, StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let fields = SerializedFields::from_entry(entry)?;
    let (content_type, content_value) = match &entry.content {
        Some(c) => (Some(c.content_type.as_str()), c.value.as_deref()),
        None => (None, None),
    };

    let result = sqlx::query(INSERT_ENTRY)
        .bind(entry.title.as_deref())
        .bind(entry.description.as_deref())
        .bind(entry.link.as_deref())
        .bind(entry.id.as_str())
        .bind(entry.author.as_deref())
        .bind(entry.published.as_deref())
        .bind(entry.updated.as_deref())
        .bind(fields.category.as_str())
        .bind(content_type)
        .bind(content_value)
        .bind(entry.comments.as_deref())
        .bind(fields.source.as_deref())
        .bind(fields.contributors.as_str())
        .bind(fields.rights.as_deref())
        .bind(fields.attachments.as_str())
        .execute(executor)
        .await
        .map_err(|source| StorageError::Write {
            id: entry.id.clone(),
            source,
        })?;

    Ok(result.rows_affected() > 0)
}

impl Database {
    // ========================================================================
    // Entry Writes
    // ========================================================================

    /// Insert a single entry; an existing row with the same id wins.
    pub async fn upsert_entry(&self, entry: &FeedEntry) -> Result<bool, StorageError> {
        insert_entry(&self.pool, entry).await
    }

    /// Write one feed's entries over a single pooled connection.
    ///
    /// Each entry is its own autocommit insert. A failing entry is logged and
    /// counted, and the session continues with the next one. The connection
    /// returns to the pool when this function exits, on every path.
    ///
    /// # Errors
    ///
    /// Only `StorageError::Acquire`, when no connection could be checked out.
    pub async fn store_entries(&self, entries: &[FeedEntry]) -> Result<StoreReport, StorageError> {
        let mut report = StoreReport::default();
        if entries.is_empty() {
            return Ok(report);
        }

        let mut conn = self.pool.acquire().await.map_err(StorageError::Acquire)?;

        for entry in entries {
            match insert_entry(&mut *conn, entry).await {
                Ok(true) => {
                    report.inserted += 1;
                    tracing::debug!(id = %entry.id, title = ?entry.title, "Inserted entry");
                }
                Ok(false) => {
                    report.duplicates += 1;
                    tracing::trace!(id = %entry.id, "Entry already stored");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(id = %entry.id, error = %e, "Failed to store entry");
                }
            }
        }

        Ok(report)
    }

    // ========================================================================
    // Entry Queries
    // ========================================================================

    pub async fn count_entries(&self) -> Result<i64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_entry(&self, id: &str) -> Result<Option<StoredEntry>, StorageError> {
        let row = sqlx::query_as::<_, StoredEntry>(
            r#"
            SELECT id, title, description, link, author, published, updated,
                   category, content_type, content_value, comments, source,
                   contributors, rights, attachments
            FROM feeds
            WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// All stored ids in insertion order.
    pub async fn entry_ids(&self) -> Result<Vec<String>, StorageError> {
        let rows: Vec<(Option<String>,)> = sqlx::query_as("SELECT id FROM feeds ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().filter_map(|(id,)| id).collect())
    }
}
