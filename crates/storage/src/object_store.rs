//! Asset storage in an object store bucket (MinIO/S3 compatible).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use dex_common::StoreError;

use crate::assets::{validate_key, AssetStore};

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Key prefix assets are written under
    pub prefix: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "pokedex".to_string(),
            prefix: "pokemon".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

/// Assets stored as objects under a bucket prefix.
///
/// A single PUT is atomic on S3-compatible stores, so no temp object is needed.
pub struct ObjectAssetStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
}

impl ObjectAssetStore {
    /// Create a new S3/MinIO-backed store from config.
    pub fn new(config: &ObjectStorageConfig) -> Result<Self, StoreError> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| StoreError::ObjectStore(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::with_store(Arc::new(store), &config.bucket, &config.prefix))
    }

    /// Wrap an existing object store (e.g. an in-memory one).
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: &str, prefix: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    fn object_path(&self, key: &str) -> Result<Path, StoreError> {
        validate_key(key)?;
        if self.prefix.is_empty() {
            Ok(Path::from(key))
        } else {
            Ok(Path::from(format!("{}/{}", self.prefix, key)))
        }
    }
}

#[async_trait]
impl AssetStore for ObjectAssetStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let location = self.object_path(key)?;

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StoreError::ObjectStore(format!(
                "Failed to check {}: {}",
                location, e
            ))),
        }
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, key = %key))]
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        let location = self.object_path(key)?;
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| StoreError::ObjectStore(format!("Failed to write {}: {}", location, e)))?;

        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, prefix = %self.prefix))]
    async fn clear(&self) -> Result<usize, StoreError> {
        use futures::TryStreamExt;

        let prefix = Path::from(self.prefix.as_str());
        let mut locations = Vec::new();

        let mut stream = self.store.list(Some(&prefix));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| StoreError::ObjectStore(format!("List failed: {}", e)))?
        {
            locations.push(meta.location);
        }

        for location in &locations {
            self.store.delete(location).await.map_err(|e| {
                StoreError::ObjectStore(format!("Failed to delete {}: {}", location, e))
            })?;
        }

        Ok(locations.len())
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }
}
