//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Result type alias for persistence backend operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A single failed network read, before any retry decision.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Why the last attempt of a fetch failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchCause {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// A network read that still failed after all retries were spent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("GET {url} failed after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub cause: FetchCause,
}

/// Errors raised by an asset store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Invalid asset key: {0}")]
    InvalidKey(String),
}

/// Failure to make an asset available in the asset store.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to store asset {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },
}

/// Failure talking to the record persistence backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Failed to decode stored record: {0}")]
    Decode(String),

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Decode(format!("JSON error: {}", err))
    }
}
