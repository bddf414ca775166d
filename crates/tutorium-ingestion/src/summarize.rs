//! Summarization — turns raw chunks and images into concise summaries via
//! the configured LLM backend.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use tutorium_llm::prompts;
use tutorium_llm::{LlmBackend, LlmError, LlmRequest, Message};

use crate::elements::ContentItem;
use crate::error::Result;

/// Temperature for summarization calls.
const SUMMARY_TEMPERATURE: f32 = 0.0;

pub struct Summarizer {
    backend: Arc<dyn LlmBackend>,
    batch_size: usize,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn LlmBackend>, batch_size: usize) -> Self {
        Self { backend, batch_size: batch_size.max(1) }
    }

    /// Summarize text and table chunks, buffered to `batch_size` per flush.
    /// Returns one summary per input item, in order.
    pub async fn summarize_chunks(&self, items: &[ContentItem]) -> std::result::Result<Vec<String>, LlmError> {
        let mut summaries = Vec::with_capacity(items.len());
        let mut buffer: Vec<&str> = Vec::with_capacity(self.batch_size);

        for item in items {
            buffer.push(&item.raw);
            if buffer.len() >= self.batch_size {
                self.flush(&mut buffer, &mut summaries).await?;
            }
        }
        self.flush(&mut buffer, &mut summaries).await?;

        Ok(summaries)
    }

    async fn flush(
        &self,
        buffer: &mut Vec<&str>,
        summaries: &mut Vec<String>,
    ) -> std::result::Result<(), LlmError> {
        if buffer.is_empty() {
            return Ok(());
        }
        let n = buffer.len();
        for content in buffer.drain(..) {
            let req = LlmRequest::from_messages(vec![
                Message::user(prompts::text_table_summary_prompt(content)),
            ])
            .with_temperature(SUMMARY_TEMPERATURE);

            let resp = self.backend.complete(req).await?;
            summaries.push(resp.content.trim().to_string());
        }
        debug!(n, "Summarized batch");
        Ok(())
    }

    /// Summarize one image with the vision model. Reads the exported file,
    /// base64-encodes it, and sends it as an image content part.
    pub async fn summarize_image(&self, image_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(image_path).await?;
        let data_url = format!("data:image/jpeg;base64,{}", BASE64.encode(&bytes));

        let req = LlmRequest::from_messages(vec![
            Message::user_with_images(prompts::IMAGE_SUMMARY_INSTRUCTION, vec![data_url]),
        ])
        .with_temperature(SUMMARY_TEMPERATURE);

        let resp = self.backend.complete(req).await?;
        Ok(resp.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tutorium_common::Modality;
    use tutorium_llm::LlmResponse;

    /// Echoes a canned summary and counts calls.
    struct FakeBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmBackend for FakeBackend {
        async fn complete(&self, req: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let has_image = matches!(
                req.messages[0].content,
                tutorium_llm::MessageContent::Parts(_)
            );
            Ok(LlmResponse {
                content: format!("summary-{n}{}", if has_image { "-vision" } else { "" }),
                model: "fake".to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            })
        }

        async fn embed(&self, texts: Vec<String>) -> std::result::Result<Vec<Vec<f32>>, LlmError> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        fn model_id(&self) -> &str { "fake" }
        fn is_local(&self) -> bool { true }
    }

    fn item(raw: &str) -> ContentItem {
        ContentItem { modality: Modality::Text, raw: raw.to_string(), page: Some(1) }
    }

    #[tokio::test]
    async fn test_one_summary_per_chunk_in_order() {
        let backend = Arc::new(FakeBackend { calls: AtomicUsize::new(0) });
        let summarizer = Summarizer::new(backend.clone(), 2);

        let items: Vec<ContentItem> = (0..5).map(|i| item(&format!("chunk {i}"))).collect();
        let summaries = summarizer.summarize_chunks(&items).await.unwrap();

        assert_eq!(summaries.len(), 5);
        assert_eq!(summaries[0], "summary-0");
        assert_eq!(summaries[4], "summary-4");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let backend = Arc::new(FakeBackend { calls: AtomicUsize::new(0) });
        let summarizer = Summarizer::new(backend.clone(), 8);
        let summaries = summarizer.summarize_chunks(&[]).await.unwrap();
        assert!(summaries.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_image_summary_sends_content_parts() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("figure.jpg");
        std::fs::write(&image_path, b"\xff\xd8\xff\xe0fakejpeg").unwrap();

        let backend = Arc::new(FakeBackend { calls: AtomicUsize::new(0) });
        let summarizer = Summarizer::new(backend, 8);
        let summary = summarizer.summarize_image(&image_path).await.unwrap();
        assert!(summary.ends_with("-vision"));
    }

    #[tokio::test]
    async fn test_missing_image_is_an_io_error() {
        let backend = Arc::new(FakeBackend { calls: AtomicUsize::new(0) });
        let summarizer = Summarizer::new(backend, 8);
        let err = summarizer.summarize_image(Path::new("missing.jpg")).await.unwrap_err();
        assert!(matches!(err, crate::error::IngestError::Io(_)));
    }
}
