//! Tutorium web server — chat UI and ingestion dashboard.
//!
//! Run with: cargo run -p tutorium-web

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tutorium=debug,info")),
        )
        .init();

    info!("📚 Tutorium starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = tutorium_common::Config::load()?;

    let db = Arc::new(tutorium_db::Database::open(&config.database.path).await?);
    db.initialize().await?;
    info!(path = %db.path(), "Vector store ready");

    let llm = tutorium_llm::build_backend(&config.llm, &config.embedding)?;
    info!(model = llm.model_id(), local = llm.is_local(), "LLM backend ready");

    let bind_addr = std::env::var("TUTORIUM_BIND")
        .unwrap_or_else(|_| config.web.bind.clone());

    let state = tutorium_web::state::AppState::new(config, db, llm);
    let app = tutorium_web::router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("🌐 Web UI listening on http://{}", bind_addr);
    info!("   Chat:      http://{}/", bind_addr);
    info!("   Ingestion: http://{}/ingestion", bind_addr);
    info!("📚 Tutorium ready. Press Ctrl+C to stop.");

    axum::serve(listener, app).await?;

    Ok(())
}
