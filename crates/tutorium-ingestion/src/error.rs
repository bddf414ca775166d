//! Ingestion error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source PDF not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("PDF parse error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] tutorium_db::DbError),

    #[error("LLM error: {0}")]
    Llm(#[from] tutorium_llm::LlmError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
