//! Download-once artwork cache.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, instrument};

use dex_common::AssetError;
use storage::AssetStore;

use crate::fetcher::BackoffFetcher;

/// How [`AssetCache::ensure_asset`] satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    /// Present before the call; nothing was fetched.
    AlreadyCached,
    /// Fetched and written.
    Downloaded { bytes: usize },
}

/// Makes sure an asset exists in the store, fetching it only when missing.
#[derive(Clone)]
pub struct AssetCache {
    fetcher: BackoffFetcher,
    store: Arc<dyn AssetStore>,
}

impl AssetCache {
    pub fn new(fetcher: BackoffFetcher, store: Arc<dyn AssetStore>) -> Self {
        Self { fetcher, store }
    }

    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    /// Ensure `key` holds the payload at `source_url`.
    ///
    /// An existing asset is never re-fetched or overwritten. Two concurrent
    /// calls for the same missing key may both download; the store's atomic
    /// write keeps the result whole either way.
    #[instrument(skip(self), fields(store = %self.store.location()))]
    pub async fn ensure_asset(&self, source_url: &str, key: &str) -> Result<AssetStatus, AssetError> {
        let exists = self
            .store
            .exists(key)
            .await
            .map_err(|source| AssetError::Store {
                key: key.to_string(),
                source,
            })?;

        if exists {
            debug!("Asset already cached, skipping download");
            return Ok(AssetStatus::AlreadyCached);
        }

        let data = self.fetcher.fetch(source_url).await?;
        let bytes = data.len();

        self.store
            .put(key, data)
            .await
            .map_err(|source| AssetError::Store {
                key: key.to_string(),
                source,
            })?;

        counter!("ingest_assets_downloaded_total").increment(1);
        info!(bytes, "Asset downloaded");

        Ok(AssetStatus::Downloaded { bytes })
    }
}
