//! tutorium-ingestion — PDF partitioning, element extraction, summarization,
//! and vector-store population.
//!
//! The flow for one textbook (see `pipeline::run_ingestion`):
//!   1. Partition the PDF in page batches (text + exported images)
//!   2. Classify raw page text into titles, narrative text, and tables
//!   3. Chunk narrative text by title
//!   4. Skip anything already in the summary cache
//!   5. Summarize new chunks (batched) and images (one vision call each)
//!   6. Embed the summaries and insert modality-tagged records
//!   7. Persist the cache

pub mod cache;
pub mod chunker;
pub mod elements;
pub mod error;
pub mod partition;
pub mod pipeline;
pub mod summarize;

pub use cache::SummaryCache;
pub use error::IngestError;
pub use pipeline::{run_ingestion, IngestionJob, IngestionProgress, IngestionResult};
