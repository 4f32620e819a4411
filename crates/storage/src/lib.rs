//! Storage abstractions for the pokedex ingester.
//!
//! Provides unified interfaces for:
//! - Asset storage (local directory or MinIO/S3) for artwork files
//! - PostgreSQL or SQLite for the normalized record table

pub mod assets;
pub mod object_store;
pub mod postgres;
pub mod records;
pub mod sqlite;

pub use self::object_store::{ObjectAssetStore, ObjectStorageConfig};
pub use assets::{AssetStore, FsAssetStore};
pub use postgres::PgRecordStore;
pub use records::{connect_record_store, RecordStore};
pub use sqlite::SqliteRecordStore;
