//! Axum router — maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    chat::{chat_clear, chat_page, chat_submit},
    ingestion::{ingestion_page, ingestion_run},
};
use crate::sse::sse_handler;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",          get(chat_page))
        .route("/chat",      post(chat_submit))
        .route("/clear",     post(chat_clear))
        .route("/ingestion", get(ingestion_page))
        .route("/ingestion/run", post(ingestion_run))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
