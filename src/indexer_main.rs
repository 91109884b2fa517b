//! Index rebuild binary.
//!
//! Run while the server is stopped: a rebuild clears and rewrites the
//! whole index, and is not meant to race live queries.
//!
//! Usage: `complaint-indexer [path/to/complaints.csv]`
//! Without an argument the configured `data.complaints_csv` is used.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use creditrust_rag::core;
use creditrust_rag::core::config::{AppPaths, ConfigService};
use creditrust_rag::ingest::{ComplaintLoader, IndexBuilder};
use creditrust_rag::llm::build_provider;
use creditrust_rag::rag::SqliteVectorStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    core::logging::init(&paths);

    let config_service = ConfigService::new(paths.clone());
    let config = config_service
        .load_config()
        .context("Failed to load configuration")?;

    let csv_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config_service.resolve_data_path(&config.data.complaints_csv));

    tracing::info!("Loading complaints from {}", csv_path.display());
    let loader = ComplaintLoader::new(&config.data.allowed_products);
    let (records, stats) = loader
        .load(&csv_path)
        .context("Failed to load complaint export")?;
    stats.log_summary();

    let store = Arc::new(
        SqliteVectorStore::new(paths.as_ref())
            .await
            .context("Failed to open vector index")?,
    );
    let provider = build_provider(&config.llm, &config.embedding)
        .context("Failed to build llm provider")?;

    let builder = IndexBuilder::new(provider, store, &config)?;
    let report = builder
        .rebuild(&records)
        .await
        .context("Index rebuild failed")?;

    println!(
        "Indexed {} chunks from {} complaints ({} skipped after normalization)",
        report.chunks_indexed, report.complaints_indexed, report.complaints_skipped_empty
    );

    Ok(())
}
