//! Pokédex ingester.
//!
//! Pulls the first-generation catalog from PokéAPI, caches each item's
//! official artwork and upserts one record per item. Also inspects and
//! resets what a previous run stored.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::{RunArgs, StorageArgs};
use ingestion::{Orchestrator, ReqwestTransport};
use storage::{AssetStore, RecordStore};

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Pokédex catalog ingester")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    storage: StorageArgs,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Log format: json (default) or text
    #[arg(long, env = "LOG_FORMAT", default_value = "json", global = true)]
    log_format: String,

    /// Serve Prometheus metrics on this address while running
    #[arg(long, env = "METRICS_ADDR", global = true)]
    metrics_addr: Option<SocketAddr>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest the catalog
    Run(RunArgs),

    /// Show how many records are stored and list the first few
    Status {
        /// Number of records to list
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },

    /// Delete every stored record and artwork file
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, &cli.log_format)?;

    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(addr = %addr, "Prometheus metrics exporter listening");
    }

    match &cli.command {
        Command::Run(args) => run(&cli.storage, args).await,
        Command::Status { limit } => status(&cli.storage, *limit).await,
        Command::Reset { yes } => reset(&cli.storage, *yes).await,
    }
}

fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if log_format.eq_ignore_ascii_case("text") {
        tracing::subscriber::set_global_default(builder.finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.with_thread_ids(true).json().finish())?;
    }

    Ok(())
}

async fn run(storage: &StorageArgs, args: &RunArgs) -> Result<()> {
    let config = args.ingest_config()?;

    info!(
        catalog_url = %config.catalog_url,
        catalog_size = config.catalog_size,
        concurrency = config.concurrency,
        max_retries = config.retry.max_retries,
        assets = ?storage.asset_backend(),
        "Starting ingestion"
    );

    let transport = Arc::new(ReqwestTransport::new(args.request_timeout())?);
    let assets = storage.open_asset_store().await?;
    let records = storage.open_record_store().await?;

    let orchestrator = Orchestrator::new(config, transport, assets, records)?;

    let result = match args.run_timeout() {
        Some(limit) => match tokio::time::timeout(limit, orchestrator.run()).await {
            Ok(result) => result,
            Err(_) => {
                error!(timeout_secs = limit.as_secs(), phase = ?orchestrator.phase(), "Ingestion run timed out");
                bail!("ingestion run timed out after {}s", limit.as_secs());
            }
        },
        None => orchestrator.run().await,
    };

    let outcome = result.context("Ingestion run failed")?;

    if outcome.is_clean() {
        info!(success = outcome.success_count, "Ingestion finished");
    } else {
        for failure in &outcome.failures {
            warn!(item = %failure.name, reason = %failure.reason, "Not ingested");
        }
        warn!(
            success = outcome.success_count,
            failed = outcome.failed_count,
            "Ingestion finished with failures"
        );
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn status(storage: &StorageArgs, limit: u32) -> Result<()> {
    let records = storage.open_record_store().await?;

    let count = records.count().await.context("Failed to count records")?;
    let listed = records
        .list(limit, 0)
        .await
        .context("Failed to list records")?;

    info!(count, listed = listed.len(), "Record store status");

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "count": count,
            "records": listed,
        }))?
    );
    Ok(())
}

async fn reset(storage: &StorageArgs, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("refusing to delete stored records and artwork without --yes");
    }

    let records = storage.open_record_store().await?;
    let assets = storage.open_asset_store().await?;

    let removed_records = records.clear().await.context("Failed to clear records")?;
    let removed_assets = assets
        .clear()
        .await
        .with_context(|| format!("Failed to clear assets in {}", assets.location()))?;

    info!(
        records = removed_records,
        assets = removed_assets,
        location = %assets.location(),
        "Reset complete"
    );

    println!(
        "{}",
        serde_json::json!({
            "records_removed": removed_records,
            "assets_removed": removed_assets,
        })
    );
    Ok(())
}
