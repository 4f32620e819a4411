//! Ingestion run coordination.
//!
//! A run lists the catalog once, processes every entry as an independent
//! task through the [`ConcurrencyLimiter`], and folds the results into a
//! [`RunOutcome`]. Only the listing can fail the run as a whole.

use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use dex_common::{CatalogEntry, HttpTransport, RunOutcome};
use storage::{AssetStore, RecordStore};

use crate::api;
use crate::asset_cache::{AssetCache, AssetStatus};
use crate::config::IngestConfig;
use crate::error::{IngestError, ItemError, Result};
use crate::fetcher::BackoffFetcher;
use crate::limiter::ConcurrencyLimiter;
use crate::normalize::{asset_key, normalize};
use crate::sink::UpsertSink;

/// Lifecycle of a run. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    ListingCatalog,
    FanningOut,
    Aggregating,
    Done,
    /// The catalog could not be listed.
    Aborted,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Aborted)
    }
}

/// Everything one item task needs, cheap to clone into each task.
#[derive(Clone)]
struct ItemPipeline {
    config: Arc<IngestConfig>,
    fetcher: BackoffFetcher,
    assets: AssetCache,
    sink: UpsertSink,
}

impl ItemPipeline {
    #[instrument(skip(self, entry), fields(item = %entry.name))]
    async fn process(&self, entry: CatalogEntry) -> std::result::Result<AssetStatus, ItemError> {
        let body = self.fetcher.fetch(&entry.detail_ref).await?;
        let detail = api::decode_detail(&body).map_err(|e| ItemError::Decode {
            url: entry.detail_ref.clone(),
            message: e.to_string(),
        })?;

        let id = detail.id;
        let record = normalize(detail, &self.config.image_path_prefix);

        let status = self
            .assets
            .ensure_asset(&self.config.asset_url(id), &asset_key(id))
            .await?;

        self.sink.upsert(&record).await?;

        Ok(status)
    }
}

/// Drives a single ingestion run.
pub struct Orchestrator {
    pipeline: ItemPipeline,
    limiter: ConcurrencyLimiter,
    phase: watch::Sender<RunPhase>,
}

impl Orchestrator {
    /// Wire an orchestrator from its configuration and backends.
    pub fn new(
        config: IngestConfig,
        transport: Arc<dyn HttpTransport>,
        assets: Arc<dyn AssetStore>,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        config.validate()?;

        let fetcher = BackoffFetcher::new(transport, config.retry);
        let limiter = ConcurrencyLimiter::new(config.concurrency)?;
        let (phase, _) = watch::channel(RunPhase::NotStarted);

        Ok(Self {
            pipeline: ItemPipeline {
                config: Arc::new(config),
                assets: AssetCache::new(fetcher.clone(), assets),
                sink: UpsertSink::new(records),
                fetcher,
            },
            limiter,
            phase,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.pipeline.config
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Observe phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    /// Execute the run. Can be called once per orchestrator.
    #[instrument(skip(self), fields(catalog_size = self.config().catalog_size, concurrency = self.config().concurrency))]
    pub async fn run(&self) -> Result<RunOutcome> {
        let started = self.phase.send_if_modified(|phase| {
            if *phase == RunPhase::NotStarted {
                *phase = RunPhase::ListingCatalog;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(IngestError::AlreadyStarted);
        }

        let start = Instant::now();

        let entries = match self.list_catalog().await {
            Ok(entries) => entries,
            Err(e) => {
                self.phase.send_replace(RunPhase::Aborted);
                return Err(e);
            }
        };
        info!(entries = entries.len(), "Catalog listed");

        self.phase.send_replace(RunPhase::FanningOut);

        let names: Vec<String> = entries.iter().map(|entry| entry.name.clone()).collect();
        let tasks: Vec<_> = entries
            .into_iter()
            .map(|entry| {
                let pipeline = self.pipeline.clone();
                async move { pipeline.process(entry).await }
            })
            .collect();

        let results = self.limiter.run(tasks).await;

        self.phase.send_replace(RunPhase::Aggregating);

        let mut outcome = RunOutcome::default();
        let mut downloaded = 0usize;
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(status) => {
                    if matches!(status, AssetStatus::Downloaded { .. }) {
                        downloaded += 1;
                    }
                    outcome.record_success();
                }
                Err(e) => {
                    warn!(item = %name, error = %e, "Item failed");
                    counter!("ingest_items_failed_total").increment(1);
                    outcome.record_failure(name, e.to_string());
                }
            }
        }

        self.phase.send_replace(RunPhase::Done);

        info!(
            success = outcome.success_count,
            failed = outcome.failed_count,
            assets_downloaded = downloaded,
            duration_ms = start.elapsed().as_millis() as u64,
            "Ingestion run complete"
        );

        Ok(outcome)
    }

    async fn list_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let url = self.config().catalog_list_url();
        let body = self.pipeline.fetcher.fetch(&url).await?;
        api::decode_catalog(&body).map_err(IngestError::CatalogDecode)
    }
}
