//! Persistence backend for normalized records.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::FromRow;

use dex_common::{NormalizedRecord, PersistenceError, PersistenceResult, Stat};

use crate::postgres::PgRecordStore;
use crate::sqlite::SqliteRecordStore;

/// Upsert-by-id storage for [`NormalizedRecord`]s.
///
/// Implementations must tolerate concurrent upserts to distinct ids.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the schema if it does not exist yet.
    async fn migrate(&self) -> PersistenceResult<()>;

    /// Insert the record, or overwrite every mutable field of the existing
    /// record with the same id, as one statement.
    async fn upsert(&self, record: &NormalizedRecord) -> PersistenceResult<()>;

    async fn get(&self, id: i64) -> PersistenceResult<Option<NormalizedRecord>>;

    async fn count(&self) -> PersistenceResult<u64>;

    /// Records ordered by id.
    async fn list(&self, limit: u32, offset: u32) -> PersistenceResult<Vec<NormalizedRecord>>;

    /// Delete every record, returning how many were removed.
    async fn clear(&self) -> PersistenceResult<u64>;
}

/// Open a record store for `database_url`, picking the backend from its scheme.
///
/// `postgres://` and `postgresql://` use PostgreSQL, `sqlite:` uses SQLite.
pub async fn connect_record_store(database_url: &str) -> PersistenceResult<Arc<dyn RecordStore>> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok(Arc::new(PgRecordStore::connect(database_url).await?))
    } else if database_url.starts_with("sqlite:") {
        Ok(Arc::new(SqliteRecordStore::connect(database_url).await?))
    } else {
        let scheme = database_url.split(':').next().unwrap_or_default();
        Err(PersistenceError::UnsupportedUrl(format!(
            "unknown scheme '{}'",
            scheme
        )))
    }
}

/// Internal row type shared by both SQL backends.
#[derive(Debug, FromRow)]
pub(crate) struct RecordRow {
    id: i64,
    name: String,
    height: i32,
    weight: i32,
    types: String,
    stats: String,
    image_path: String,
}

impl TryFrom<RecordRow> for NormalizedRecord {
    type Error = PersistenceError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let stats: Vec<Stat> = serde_json::from_str(&row.stats)?;
        Ok(NormalizedRecord {
            id: row.id,
            name: row.name,
            height: row.height,
            weight: row.weight,
            types: row.types,
            stats,
            image_path: row.image_path,
        })
    }
}

pub(crate) fn rows_to_records(rows: Vec<RecordRow>) -> PersistenceResult<Vec<NormalizedRecord>> {
    rows.into_iter().map(NormalizedRecord::try_from).collect()
}

/// Stats are stored as a JSON array of `{name, value}` objects.
pub(crate) fn encode_stats(stats: &[Stat]) -> PersistenceResult<String> {
    Ok(serde_json::to_string(stats)?)
}

/// Split a `;`-separated schema script into executable statements.
pub(crate) fn schema_statements(schema: &str) -> impl Iterator<Item = &str> {
    schema.split(';').map(str::trim).filter(|s| !s.is_empty())
}
