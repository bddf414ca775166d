//! Ingestion runner — partitions the configured textbook PDFs, summarizes
//! new content, and populates the vector store.
//!
//! Run with: cargo run -p tutorium-ingestion --bin ingest [--reset] [pdf ...]

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tutorium_db::{Database, SourceRepository, SummaryRepository};
use tutorium_ingestion::pipeline::{run_ingestion, IngestionJob};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tutorium=debug,info")),
        )
        .init();

    info!("📘 Tutorium ingestion starting");

    let config = tutorium_common::Config::load()?;

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let reset = args.iter().any(|a| a == "--reset");
    args.retain(|a| a != "--reset");

    let mut job = IngestionJob::from_config(&config);
    job.reset = reset;
    if !args.is_empty() {
        job.pdf_paths = args.iter().map(PathBuf::from).collect();
    }
    if job.pdf_paths.is_empty() {
        warn!("No PDFs to ingest. Pass paths as arguments or set [ingestion].pdf_paths in tutorium.toml.");
        return Ok(());
    }

    let db = Arc::new(Database::open(&config.database.path).await?);
    db.initialize().await?;
    let sources = Arc::new(SourceRepository::new(db.clone()));
    let summaries = Arc::new(SummaryRepository::new(db.clone()));

    let backend = tutorium_llm::build_backend(&config.llm, &config.embedding)?;
    info!(model = backend.model_id(), local = backend.is_local(), "LLM backend ready");

    let result = run_ingestion(job, sources, summaries.clone(), backend, None).await;

    info!("✅ Ingestion complete in {} ms", result.duration_ms);
    info!("📝 Text summaries:  {}", result.text_summaries);
    info!("📊 Table summaries: {}", result.table_summaries);
    info!("🖼  Image summaries: {} ({} skipped)", result.image_summaries, result.images_skipped);
    info!("   Cache hits: {}", result.cached_hits);
    for err in &result.errors {
        warn!("{err}");
    }

    // An index only helps once there is data; failures here are non-fatal.
    if summaries.count().await.unwrap_or(0) > 0 {
        if let Err(e) = db.create_vector_index().await {
            warn!("Vector index creation skipped: {e}");
        }
    }

    Ok(())
}
