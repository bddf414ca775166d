//! Answer assembly: QA prompt over text/table context, an optional vision
//! pass over image context, and a merged final answer.

use anyhow::Context;
use tracing::debug;

use tutorium_llm::prompts;
use tutorium_llm::{LlmBackend, LlmRequest, Message};

use crate::retrieve::RetrievedContext;

/// Temperature for answering (summarization runs at 0).
const QA_TEMPERATURE: f32 = 0.2;
const QA_MAX_TOKENS: u32 = 512;

/// Answer a question from retrieved context.
///
/// Text and table summaries feed one grounded QA completion; image context
/// feeds a second, vision-capable completion. The image answer, when present,
/// is appended under its own heading.
pub async fn answer(
    backend: &dyn LlmBackend,
    ctx: &RetrievedContext,
    question: &str,
) -> anyhow::Result<String> {
    let mut text_answer = String::new();
    let mut image_answer = String::new();

    // Text + table reasoning. Also runs with empty context when nothing was
    // retrieved at all, so the prompt's own fallback sentence applies.
    if !ctx.texts.is_empty() || !ctx.tables.is_empty() || ctx.images.is_empty() {
        let mut context_blocks: Vec<&str> = Vec::new();
        context_blocks.extend(ctx.texts.iter().map(String::as_str));
        context_blocks.extend(ctx.tables.iter().map(String::as_str));
        let context = context_blocks.join("\n\n");

        let req = LlmRequest::from_messages(vec![
            Message::user(prompts::qa_prompt(&context, question)),
        ])
        .with_temperature(QA_TEMPERATURE)
        .with_max_tokens(QA_MAX_TOKENS);

        let resp = backend.complete(req).await.context("text answer failed")?;
        text_answer = resp.content.trim().to_string();
    }

    // Vision reasoning over retrieved images.
    if !ctx.images.is_empty() {
        let data_urls: Vec<String> = ctx.images.iter()
            .filter_map(|img| img.data_url.clone())
            .collect();
        let fallback_summaries: Vec<String> = ctx.images.iter()
            .filter(|img| img.data_url.is_none())
            .map(|img| img.summary.clone())
            .collect();

        let prompt = prompts::vision_qa_prompt(&fallback_summaries, question);
        let message = if data_urls.is_empty() {
            Message::user(prompt)
        } else {
            Message::user_with_images(prompt, data_urls)
        };

        let req = LlmRequest::from_messages(vec![message])
            .with_temperature(QA_TEMPERATURE)
            .with_max_tokens(QA_MAX_TOKENS);

        let resp = backend.complete(req).await.context("image answer failed")?;
        image_answer = resp.content.trim().to_string();
    }

    let mut final_answer = text_answer;
    if !image_answer.is_empty() {
        if !final_answer.is_empty() {
            final_answer.push_str("\n\n");
        }
        final_answer.push_str("📷 **From the images:**\n");
        final_answer.push_str(&image_answer);
    }

    debug!(
        question,
        chars = final_answer.len(),
        with_images = !ctx.images.is_empty(),
        "Answer assembled"
    );

    Ok(final_answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::ImageContext;
    use async_trait::async_trait;
    use tutorium_llm::{LlmError, LlmResponse, MessageContent};

    /// Answers "text-pass" for plain prompts and "vision-pass" for
    /// multimodal ones.
    struct FakeBackend;

    #[async_trait]
    impl LlmBackend for FakeBackend {
        async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
            let content = match &req.messages[0].content {
                MessageContent::Text(t) if t.contains("vision-capable") => "vision-pass",
                MessageContent::Parts(_) => "vision-pass",
                _ => "text-pass",
            };
            Ok(LlmResponse {
                content: content.to_string(),
                model: "fake".to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            })
        }

        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        fn model_id(&self) -> &str { "fake" }
        fn is_local(&self) -> bool { true }
    }

    #[tokio::test]
    async fn test_text_only_context_has_no_image_section() {
        let ctx = RetrievedContext {
            texts: vec!["chapter summary".to_string()],
            tables: vec![],
            images: vec![],
        };
        let out = answer(&FakeBackend, &ctx, "What is an acid?").await.unwrap();
        assert_eq!(out, "text-pass");
    }

    #[tokio::test]
    async fn test_image_context_appends_image_section() {
        let ctx = RetrievedContext {
            texts: vec!["chapter summary".to_string()],
            tables: vec![],
            images: vec![ImageContext {
                summary: "a ray diagram".to_string(),
                data_url: Some("data:image/jpeg;base64,AAAA".to_string()),
            }],
        };
        let out = answer(&FakeBackend, &ctx, "What does the figure show?").await.unwrap();
        assert!(out.starts_with("text-pass"));
        assert!(out.contains("From the images:"));
        assert!(out.contains("vision-pass"));
    }

    #[tokio::test]
    async fn test_image_only_context_skips_text_pass() {
        let ctx = RetrievedContext {
            texts: vec![],
            tables: vec![],
            images: vec![ImageContext {
                summary: "a circuit diagram".to_string(),
                data_url: None,
            }],
        };
        let out = answer(&FakeBackend, &ctx, "Describe the circuit.").await.unwrap();
        assert!(out.starts_with("📷"));
        assert!(out.contains("vision-pass"));
        assert!(!out.contains("text-pass"));
    }

    #[tokio::test]
    async fn test_empty_context_still_answers() {
        let ctx = RetrievedContext::default();
        let out = answer(&FakeBackend, &ctx, "Anything?").await.unwrap();
        assert_eq!(out, "text-pass");
    }
}
