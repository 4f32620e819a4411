//! Common types shared across the pokedex ingestion crates.

pub mod error;
pub mod record;
pub mod transport;

pub use error::{
    AssetError, FetchCause, FetchError, PersistenceError, PersistenceResult, StoreError,
    TransportError,
};
pub use record::{CatalogEntry, FailedItem, ItemDetail, NormalizedRecord, RunOutcome, Stat};
pub use transport::{HttpResponse, HttpTransport};
