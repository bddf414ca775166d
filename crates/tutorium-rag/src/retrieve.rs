//! Query-time retrieval: embed the question, search the vector store, and
//! split the hits by modality.

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;
use tracing::{debug, warn};

use tutorium_common::Modality;
use tutorium_db::{SummaryRecord, SummaryRepository};
use tutorium_llm::{l2_normalize, LlmBackend};

/// Image context for the vision pass. `data_url` carries the raw image when
/// the exported file is still on disk; otherwise only the stored summary is
/// available.
#[derive(Debug, Clone)]
pub struct ImageContext {
    pub summary: String,
    pub data_url: Option<String>,
}

/// Retrieved summaries grouped by modality.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub texts: Vec<String>,
    pub tables: Vec<String>,
    pub images: Vec<ImageContext>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.tables.is_empty() && self.images.is_empty()
    }
}

/// Retrieve the top-k summaries most relevant to the question.
pub async fn retrieve(
    summaries: &SummaryRepository,
    backend: &dyn LlmBackend,
    question: &str,
    top_k: usize,
) -> anyhow::Result<RetrievedContext> {
    let mut vectors = backend
        .embed(vec![question.to_string()])
        .await
        .context("question embedding failed")?;
    let query_vec = l2_normalize(
        &vectors.pop().context("embedding backend returned no vector")?,
    );

    let hits = summaries
        .search_similar(&query_vec, top_k)
        .await
        .context("vector search failed")?;

    let ctx = split_by_modality(&hits);
    debug!(
        question,
        texts = ctx.texts.len(),
        tables = ctx.tables.len(),
        images = ctx.images.len(),
        "Context retrieved"
    );

    Ok(ctx)
}

/// Group search hits by modality. Image hits get their raw bytes loaded from
/// the exported file; when the file is gone the stored summary stands in.
pub fn split_by_modality(hits: &[SummaryRecord]) -> RetrievedContext {
    let mut ctx = RetrievedContext::default();

    for hit in hits {
        match hit.modality {
            Modality::Text => ctx.texts.push(hit.content.clone()),
            Modality::Table => ctx.tables.push(hit.content.clone()),
            Modality::Image => {
                let data_url = match std::fs::read(Path::new(&hit.raw_ref)) {
                    Ok(bytes) => Some(format!(
                        "data:image/jpeg;base64,{}",
                        BASE64.encode(&bytes)
                    )),
                    Err(e) => {
                        warn!(image = %hit.raw_ref, error = %e, "Image file unavailable, using summary only");
                        None
                    }
                };
                ctx.images.push(ImageContext {
                    summary: hit.content.clone(),
                    data_url,
                });
            }
        }
    }

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(modality: Modality, content: &str, raw_ref: &str) -> SummaryRecord {
        SummaryRecord::new(
            uuid::Uuid::new_v4(),
            "data/book.pdf".to_string(),
            modality,
            content.to_string(),
            raw_ref.to_string(),
        )
    }

    #[test]
    fn test_split_groups_by_modality() {
        let hits = vec![
            record(Modality::Text, "text summary", "raw text"),
            record(Modality::Table, "table summary", "a  b"),
            record(Modality::Text, "another text", "more raw"),
        ];
        let ctx = split_by_modality(&hits);
        assert_eq!(ctx.texts, vec!["text summary", "another text"]);
        assert_eq!(ctx.tables, vec!["table summary"]);
        assert!(ctx.images.is_empty());
        assert!(!ctx.is_empty());
    }

    #[test]
    fn test_image_hit_loads_file_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("fig.jpg");
        std::fs::write(&image_path, b"\xff\xd8\xff\xe0jpegdata").unwrap();

        let hits = vec![record(
            Modality::Image,
            "a ray diagram",
            &image_path.to_string_lossy(),
        )];
        let ctx = split_by_modality(&hits);
        assert_eq!(ctx.images.len(), 1);
        let data_url = ctx.images[0].data_url.as_ref().unwrap();
        assert!(data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_missing_image_file_falls_back_to_summary() {
        let hits = vec![record(Modality::Image, "a prism figure", "gone/fig.jpg")];
        let ctx = split_by_modality(&hits);
        assert_eq!(ctx.images.len(), 1);
        assert!(ctx.images[0].data_url.is_none());
        assert_eq!(ctx.images[0].summary, "a prism figure");
    }

    #[test]
    fn test_empty_hits_yield_empty_context() {
        let ctx = split_by_modality(&[]);
        assert!(ctx.is_empty());
    }
}
