//! Shared application state for the web server.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use tutorium_common::Config;
use tutorium_db::{Database, SourceRepository, SummaryRepository};
use tutorium_llm::LlmBackend;

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Ingestion pipeline status update
    PipelineStatus { stage: String, message: String, count: u64 },
    /// General system notification
    Notification { level: String, message: String },
}

/// One message of the chat session.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: String,   // "user" | "assistant"
    pub content: String,
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub db: Arc<Database>,
    pub sources: SourceRepository,
    pub summaries: SummaryRepository,
    pub llm: Arc<dyn LlmBackend>,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
    /// In-process chat session memory
    pub history: Mutex<Vec<ChatTurn>>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<Database>, llm: Arc<dyn LlmBackend>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            sources: SourceRepository::new(db.clone()),
            summaries: SummaryRepository::new(db.clone()),
            config,
            db,
            llm,
            event_tx,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }
}

pub type SharedState = Arc<AppState>;
