//! Record store backed by PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, instrument};

use dex_common::{NormalizedRecord, PersistenceError, PersistenceResult};

use crate::records::{encode_stats, rows_to_records, schema_statements, RecordRow, RecordStore};

/// Database connection pool and record operations.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new store connection from database URL.
    pub async fn connect(database_url: &str) -> PersistenceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
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
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8
            )
            ON CONFLICT (id)
            DO UPDATE SET
                name = EXCLUDED.name,
                height = EXCLUDED.height,
                weight = EXCLUDED.weight,
                types = EXCLUDED.types,
                stats = EXCLUDED.stats,
                image_path = EXCLUDED.image_path,
                ingested_at = EXCLUDED.ingested_at
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
             FROM pokemon WHERE id = $1",
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
             FROM pokemon ORDER BY id ASC LIMIT $1 OFFSET $2",
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

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pokemon (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    height INTEGER NOT NULL,
    weight INTEGER NOT NULL,
    types TEXT NOT NULL,
    stats TEXT NOT NULL,
    image_path TEXT NOT NULL,
    ingested_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_pokemon_name ON pokemon(name);
"#;
