//! Ingester configuration.
//!
//! Every setting is a flag with an environment fallback; `.env` is loaded
//! before parsing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use ingestion::config::{
    DEFAULT_ASSET_URL_TEMPLATE, DEFAULT_CATALOG_SIZE, DEFAULT_CATALOG_URL, DEFAULT_CONCURRENCY,
    DEFAULT_IMAGE_PATH_PREFIX,
};
use ingestion::{IngestConfig, RetryPolicy};
use storage::{AssetStore, FsAssetStore, ObjectAssetStore, ObjectStorageConfig, RecordStore};

/// Where records and assets live. Shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Record store URL (postgres://, postgresql:// or sqlite:)
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:pokedex.db?mode=rwc",
        global = true
    )]
    pub database_url: String,

    /// Local directory for artwork (ignored when --s3-bucket is set)
    #[arg(long, env = "ASSET_DIR", default_value = "public/pokemon", global = true)]
    pub asset_dir: PathBuf,

    /// Store artwork in this S3/MinIO bucket instead of a local directory
    #[arg(long, env = "S3_BUCKET", global = true)]
    pub s3_bucket: Option<String>,

    /// S3/MinIO endpoint URL
    #[arg(long, env = "S3_ENDPOINT", default_value = "http://minio:9000", global = true)]
    pub s3_endpoint: String,

    /// Key prefix for artwork objects
    #[arg(long, env = "S3_PREFIX", default_value = "pokemon", global = true)]
    pub s3_prefix: String,

    #[arg(long, env = "S3_ACCESS_KEY", default_value = "minioadmin", global = true, hide_env_values = true)]
    pub s3_access_key: String,

    #[arg(long, env = "S3_SECRET_KEY", default_value = "minioadmin", global = true, hide_env_values = true)]
    pub s3_secret_key: String,

    #[arg(long, env = "S3_REGION", default_value = "us-east-1", global = true)]
    pub s3_region: String,

    /// Allow plain HTTP to the object store (local MinIO)
    #[arg(
        long,
        env = "S3_ALLOW_HTTP",
        default_value_t = true,
        action = clap::ArgAction::Set,
        global = true
    )]
    pub s3_allow_http: bool,
}

/// Settings of the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Catalog list endpoint
    #[arg(long, env = "CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Number of catalog items to ingest
    #[arg(long, env = "CATALOG_SIZE", default_value_t = DEFAULT_CATALOG_SIZE)]
    pub catalog_size: u32,

    /// Maximum items processed at once
    #[arg(long, env = "CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Retries per request after the first attempt
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Wait before the first retry, doubled on each further retry
    #[arg(long, env = "INITIAL_BACKOFF_MS", default_value_t = 500)]
    pub initial_backoff_ms: u64,

    /// Per-request timeout
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Artwork source; `{id}` is replaced with the item id
    #[arg(long, env = "ASSET_URL_TEMPLATE", default_value = DEFAULT_ASSET_URL_TEMPLATE)]
    pub asset_url_template: String,

    /// Public path prefix stored in each record's image path
    #[arg(long, env = "IMAGE_PATH_PREFIX", default_value = DEFAULT_IMAGE_PATH_PREFIX)]
    pub image_path_prefix: String,

    /// Abort the whole run after this many seconds
    #[arg(long, env = "RUN_TIMEOUT_SECS")]
    pub run_timeout_secs: Option<u64>,
}

impl RunArgs {
    /// Library configuration for one run, validated.
    pub fn ingest_config(&self) -> Result<IngestConfig> {
        let config = IngestConfig {
            catalog_url: self.catalog_url.clone(),
            catalog_size: self.catalog_size,
            concurrency: self.concurrency,
            retry: RetryPolicy::new(
                self.max_retries,
                Duration::from_millis(self.initial_backoff_ms),
            ),
            asset_url_template: self.asset_url_template.clone(),
            image_path_prefix: self.image_path_prefix.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

/// Asset store selected by the storage flags.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetBackend {
    Local(PathBuf),
    ObjectStore {
        endpoint: String,
        bucket: String,
        prefix: String,
    },
}

impl StorageArgs {
    pub fn asset_backend(&self) -> AssetBackend {
        match &self.s3_bucket {
            Some(bucket) => AssetBackend::ObjectStore {
                endpoint: self.s3_endpoint.clone(),
                bucket: bucket.clone(),
                prefix: self.s3_prefix.clone(),
            },
            None => AssetBackend::Local(self.asset_dir.clone()),
        }
    }

    fn object_storage_config(&self, bucket: &str) -> ObjectStorageConfig {
        ObjectStorageConfig {
            endpoint: self.s3_endpoint.clone(),
            bucket: bucket.to_string(),
            prefix: self.s3_prefix.clone(),
            access_key_id: self.s3_access_key.clone(),
            secret_access_key: self.s3_secret_key.clone(),
            region: self.s3_region.clone(),
            allow_http: self.s3_allow_http,
        }
    }

    /// Open the asset store, creating the local directory if needed.
    pub async fn open_asset_store(&self) -> Result<Arc<dyn AssetStore>> {
        match &self.s3_bucket {
            Some(bucket) => {
                let store = ObjectAssetStore::new(&self.object_storage_config(bucket))
                    .context("Failed to open object storage")?;
                Ok(Arc::new(store))
            }
            None => {
                let store = FsAssetStore::open(&self.asset_dir).await.with_context(|| {
                    format!("Failed to open asset directory {}", self.asset_dir.display())
                })?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Connect to the record store and make sure the schema exists.
    pub async fn open_record_store(&self) -> Result<Arc<dyn RecordStore>> {
        if self.database_url.trim().is_empty() {
            bail!("DATABASE_URL is empty");
        }

        let store = storage::connect_record_store(&self.database_url)
            .await
            .context("Failed to connect to record store")?;
        store
            .migrate()
            .await
            .context("Failed to run record store migrations")?;

        Ok(store)
    }
}
