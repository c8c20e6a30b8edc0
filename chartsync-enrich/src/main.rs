//! chartsync-enrich - catalog enrichment pipeline
//!
//! Reads a curated ranked list, resolves every entry against the catalog
//! API, bulk-hydrates the discovered IDs, and exports the dataset as
//! JSON, CSV, and SQL insert scripts.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chartsync_common::config::Config;
use chartsync_enrich::auth::Authenticator;
use chartsync_enrich::catalog::CatalogClient;
use chartsync_enrich::export::export_dataset;
use chartsync_enrich::models::load_list;
use chartsync_enrich::pipeline;

/// Command-line arguments for chartsync-enrich
#[derive(Parser, Debug)]
#[command(name = "chartsync-enrich")]
#[command(about = "Enrich a curated ranked music list with catalog metadata")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, env = "CHARTSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Curated list JSON file (overrides the config file)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory (overrides the config file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only process the first N list items
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chartsync_enrich=info,chartsync_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let started = Instant::now();

    info!("Starting chartsync-enrich");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(args.config.as_deref())?;
    let input_path = args.input.unwrap_or_else(|| config.input_path.clone());
    let out_dir = args.output.unwrap_or_else(|| config.output_dir.clone());

    let mut items = load_list(&input_path)
        .with_context(|| format!("Failed to load input list {}", input_path.display()))?;
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }
    info!(items = items.len(), input = %input_path.display(), "Input list loaded");

    let mut auth = Authenticator::load(&config.auth.store_path, &config.auth.account)
        .context("Failed to load credential store")?;
    if auth.is_expired() {
        info!("Access token expired, refreshing");
        auth.refresh().await.context("Token refresh failed")?;
    }

    let catalog = CatalogClient::new(&config.catalog, auth.headers()?)
        .context("Failed to build catalog client")?;

    let report = pipeline::run(&catalog, &items, config.batch, config.retry).await;

    // Whatever the run accumulated is exported, complete or not.
    export_dataset(
        &report.tracks,
        &report.albums,
        &report.artists,
        &out_dir,
        &config.sql_schema,
    )?;

    info!(
        resolved = report.resolved,
        skipped = report.skipped,
        elapsed = ?started.elapsed(),
        "Finished"
    );

    if let Some(failure) = report.failure {
        warn!("Run ended early; the exported dataset is partial");
        return Err(anyhow::Error::new(failure).context("Enrichment run failed"));
    }

    Ok(())
}
