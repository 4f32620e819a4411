//! Pokédex catalog ingestion library.
//!
//! Pulls a fixed-size catalog from a read-only API, caches each item's
//! artwork, and upserts a normalized record per item.
//!
//! # Architecture
//!
//! - [`BackoffFetcher`]: one GET with bounded retries and exponential delay
//! - [`AssetCache`]: downloads an asset only if the store does not have it
//! - [`ConcurrencyLimiter`]: semaphore-gated fan-out collecting every result
//! - [`UpsertSink`]: idempotent record writes
//! - [`Orchestrator`]: list, fan out, aggregate into a [`RunOutcome`]

pub mod api;
pub mod asset_cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod limiter;
pub mod normalize;
pub mod orchestrator;
pub mod sink;

// Re-exports
pub use asset_cache::{AssetCache, AssetStatus};
pub use config::{IngestConfig, RetryPolicy};
pub use dex_common::RunOutcome;
pub use error::{IngestError, ItemError, Result};
pub use fetcher::{BackoffFetcher, ReqwestTransport};
pub use limiter::{ConcurrencyLimiter, TaskFailure};
pub use normalize::{asset_key, image_path, normalize};
pub use orchestrator::{Orchestrator, RunPhase};
pub use sink::UpsertSink;
