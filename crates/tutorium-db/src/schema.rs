//! Schema definitions for LanceDB tables.
//!
//! LanceDB uses Apache Arrow for storage, so schemas are defined with Arrow
//! types; the embedding column is a fixed-size float list.

use tutorium_common::Modality;

/// Embedding dimension (llava:7b produces 4096-dim vectors).
pub const EMBEDDING_DIM: usize = 4096;

pub const TABLE_SOURCES: &str = "sources";
pub const TABLE_SUMMARIES: &str = "summaries";

// =============================================================================
// Source Schema
// =============================================================================

/// One ingested textbook PDF.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceDoc {
    pub id: uuid::Uuid,
    pub path: String,
    pub title: Option<String>,
    pub page_count: i64,
    /// "pending" | "parsed" | "failed"
    pub parse_status: String,
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl SourceDoc {
    pub fn new(path: String, title: Option<String>, page_count: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            path,
            title,
            page_count,
            parse_status: "pending".to_string(),
            ingested_at: chrono::Utc::now(),
        }
    }
}

// =============================================================================
// Summary Schema
// =============================================================================

/// A modality-tagged summary with its embedding.
///
/// `content` holds the model-produced summary (the embedded text); `raw_ref`
/// holds the raw chunk text for text/table rows and the exported image file
/// path for image rows.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SummaryRecord {
    pub id: uuid::Uuid,
    pub source_id: uuid::Uuid,
    pub source_path: String,
    pub modality: Modality,
    pub content: String,
    pub raw_ref: String,
    pub page: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub embedding: Option<Vec<f32>>,
}

impl SummaryRecord {
    pub fn new(
        source_id: uuid::Uuid,
        source_path: String,
        modality: Modality,
        content: String,
        raw_ref: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            source_id,
            source_path,
            modality,
            content,
            raw_ref,
            page: None,
            created_at: chrono::Utc::now(),
            embedding: None,
        }
    }

    pub fn with_page(mut self, page: Option<i64>) -> Self {
        self.page = page;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_summary_starts_without_embedding() {
        let s = SummaryRecord::new(
            uuid::Uuid::new_v4(),
            "data/book.pdf".to_string(),
            Modality::Table,
            "A summary.".to_string(),
            "| a | b |".to_string(),
        );
        assert!(s.embedding.is_none());
        assert_eq!(s.modality, Modality::Table);
    }

    #[test]
    fn test_new_source_is_pending() {
        let s = SourceDoc::new("data/book.pdf".to_string(), None, 312);
        assert_eq!(s.parse_status, "pending");
        assert_eq!(s.page_count, 312);
    }
}
