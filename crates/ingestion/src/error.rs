//! Error types for the ingestion crate.

use thiserror::Error;

use dex_common::{AssetError, FetchError, PersistenceError};

/// Failure of a single item's task. Counted, never propagated to the run.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("detail fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("invalid detail payload from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("{0}")]
    Asset(#[from] AssetError),

    #[error("persist failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors that abort a whole run.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("catalog listing failed: {0}")]
    CatalogFetch(#[from] FetchError),

    #[error("invalid catalog payload: {0}")]
    CatalogDecode(#[source] serde_json::Error),

    #[error("ingestion run already started")]
    AlreadyStarted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
