//! Tutorium Database Layer
//!
//! Embedded vector store built on LanceDB: one table for ingested textbook
//! sources and one for modality-tagged summary records with their embeddings.
//!
//! # Example
//!
//! ```rust,no_run
//! use tutorium_db::{Database, SummaryRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("./data/tutorium.db").await?;
//!     db.initialize().await?;
//!
//!     let summaries = SummaryRepository::new(std::sync::Arc::new(db));
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod schema;
pub mod schema_arrow;
pub mod sources;
pub mod summaries;

pub use database::Database;
pub use error::{DbError, Result};
pub use schema::{
    SourceDoc, SummaryRecord,
    EMBEDDING_DIM, TABLE_SOURCES, TABLE_SUMMARIES,
};
pub use sources::SourceRepository;
pub use summaries::SummaryRepository;
