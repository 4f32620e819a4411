//! Record store backed by SQLite, for local runs and tests.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, instrument};

use dex_common::{NormalizedRecord, PersistenceError, PersistenceResult};

use crate::records::{encode_stats, rows_to_records, schema_statements, RecordRow, RecordStore};

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open or create the database at `database_url` (e.g. `sqlite://pokedex.db`
    /// or `sqlite::memory:`).
    pub async fn connect(database_url: &str) -> PersistenceResult<Self> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::Connection(e.to_string()))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// In-memory database with the schema already applied.
    pub async fn in_memory() -> PersistenceResult<Self> {
        let store = Self::connect("sqlite::memory:").await?;
        store.migrate().await?;
        Ok(store)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn migrate(&self) -> PersistenceResult<()> {
        for statement in schema_statements(SCHEMA_SQL) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| PersistenceError::Migration(e.to_string()))?;
        }

        Ok(())
    }

    #[instrument(skip(self, record), fields(id = record.id, name = %record.name))]
    async fn upsert(&self, record: &NormalizedRecord) -> PersistenceResult<()> {
        let stats = encode_stats(&record.stats)?;

        sqlx::query(
            r#"
            INSERT INTO pokemon (
                id, name, height, weight, types, stats, image_path, ingested_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                height = excluded.height,
                weight = excluded.weight,
                types = excluded.types,
                stats = excluded.stats,
                image_path = excluded.image_path,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(record.height)
        .bind(record.weight)
        .bind(&record.types)
        .bind(&stats)
        .bind(&record.image_path)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::Query(format!("Upsert failed: {}", e)))?;

        debug!("Upserted record");
        Ok(())
    }

    async fn get(&self, id: i64) -> PersistenceResult<Option<NormalizedRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT id, name, height, weight, types, stats, image_path \
             FROM pokemon WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PersistenceError::Query(e.to_string()))?;

        row.map(NormalizedRecord::try_from).transpose()
    }

    async fn count(&self) -> PersistenceResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pokemon")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PersistenceError::Query(e.to_string()))?;

        Ok(count as u64)
    }

    async fn list(&self, limit: u32, offset: u32) -> PersistenceResult<Vec<NormalizedRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT id, name, height, weight, types, stats, image_path \
             FROM pokemon ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::Query(e.to_string()))?;

        rows_to_records(rows)
    }

    async fn clear(&self) -> PersistenceResult<u64> {
        let result = sqlx::query("DELETE FROM pokemon")
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::Query(format!("Delete failed: {}", e)))?;

        Ok(result.rows_affected())
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pokemon (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    height INTEGER NOT NULL,
    weight INTEGER NOT NULL,
    types TEXT NOT NULL,
    stats TEXT NOT NULL,
    image_path TEXT NOT NULL,
    ingested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pokemon_name ON pokemon(name);
"#;
