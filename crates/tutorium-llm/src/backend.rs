//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   OllamaBackend           — local Ollama (OpenAI-compatible chat endpoint,
//!                             native /api/embeddings for vectors)
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (LMStudio,
//!                             vLLM, Groq, OpenRouter, …)
//!
//! Vision requests use OpenAI-style content parts (text + image_url data
//! URLs), which both backends pass through unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tutorium_common::config::{EmbeddingConfig, LlmConfig};

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

// ── Request / Response ────────────────────────────────────────────────────────

/// Message content: plain text, or OpenAI-style multimodal parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: MessageContent,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: MessageContent::Text(content.into()) }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: MessageContent::Text(content.into()) }
    }

    /// A user message carrying text plus base64 data-URL images.
    pub fn user_with_images(text: impl Into<String>, image_data_urls: Vec<String>) -> Self {
        let mut parts = vec![ContentPart::Text { text: text.into() }];
        for url in image_data_urls {
            parts.push(ContentPart::ImageUrl { image_url: ImageUrl { url } });
        }
        Self { role: "user".to_string(), content: MessageContent::Parts(parts) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages, model: None, max_tokens: None, temperature: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError>;
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().await?;
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

/// L2-normalize a vector; zero vectors stay finite.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-10);
    v.iter().map(|x| x / norm).collect()
}

// ── 1. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    pub embedding_model: Option<String>,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            embedding_model: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(4096),
            "temperature": req.temperature.unwrap_or(0.0),
        });
        let resp = self.client.post(&url).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let model = self.embedding_model.as_deref().unwrap_or(&self.model);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({"model": model, "prompt": text});
            let resp = self.client.post(&url).json(&body).send().await?;
            let json = check_response_status(resp).await?;
            let vec: Vec<f32> = serde_json::from_value(json["embedding"].clone())?;
            out.push(vec);
        }
        Ok(out)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
}

// ── 2. OpenAI-Compatible (LMStudio, vLLM, Groq, OpenRouter, …) ────────────────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    pub embedding_model: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            embedding_model: None,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k),
            None    => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(4096),
            "temperature": req.temperature.unwrap_or(0.0),
        });
        let resp = self.auth(self.client.post(&url)).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        let emb_model = self.embedding_model.as_deref().unwrap_or(&self.model);
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({"model": emb_model, "input": texts});
        let resp = self.auth(self.client.post(&url)).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        let embeddings: Vec<Vec<f32>> = json["data"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .map(|item| serde_json::from_value(item["embedding"].clone()).unwrap_or_default())
            .collect();
        Ok(embeddings)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Build a backend from the `[llm]` / `[embedding]` config sections.
pub fn build_backend(
    llm: &LlmConfig,
    embedding: &EmbeddingConfig,
) -> Result<std::sync::Arc<dyn LlmBackend>, LlmError> {
    tracing::debug!(
        backend = %llm.backend,
        model = %llm.model,
        embedding_model = %embedding.model,
        "Building LLM backend"
    );
    match llm.backend.as_str() {
        "ollama" => {
            let backend = OllamaBackend::new(&llm.base_url, &llm.model)
                .with_embedding_model(&embedding.model);
            Ok(std::sync::Arc::new(backend))
        }
        "openai_compatible" => {
            let key = if llm.api_key.is_empty() {
                std::env::var("TUTORIUM_LLM_API_KEY").ok()
            } else {
                Some(llm.api_key.clone())
            };
            let backend = OpenAiCompatibleBackend::new(&llm.base_url, &llm.model, key)
                .with_embedding_model(&embedding.model);
            Ok(std::sync::Arc::new(backend))
        }
        other => Err(LlmError::Unavailable(format!("unknown backend kind '{other}'"))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_is_local() {
        let b = OllamaBackend::new("http://localhost:11434", "llava:7b");
        assert!(b.is_local());
        assert_eq!(b.model_id(), "llava:7b");
    }

    #[test]
    fn test_compat_backend_with_no_key() {
        let b = OpenAiCompatibleBackend::new("http://localhost:1234", "local-model", None);
        // No API key is valid for LMStudio / vLLM
        assert!(!b.is_local());
        assert_eq!(b.model_id(), "local-model");
    }

    #[test]
    fn test_embedding_model_override() {
        let b = OllamaBackend::new("http://localhost:11434", "llava:7b")
            .with_embedding_model("nomic-embed-text");
        assert_eq!(b.embedding_model.as_deref(), Some("nomic-embed-text"));
    }

    #[test]
    fn test_multimodal_message_serializes_to_content_parts() {
        let msg = Message::user_with_images(
            "Describe this image.",
            vec!["data:image/jpeg;base64,AAAA".to_string()],
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_plain_message_serializes_to_string_content() {
        let msg = Message::user("What is photosynthesis?");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"], "What is photosynthesis?");
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_is_safe() {
        let v = l2_normalize(&[0.0, 0.0]);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_build_backend_rejects_unknown_kind() {
        let mut llm = tutorium_common::config::LlmConfig::default();
        llm.backend = "bedrock".to_string();
        let embedding = tutorium_common::config::EmbeddingConfig::default();
        assert!(build_backend(&llm, &embedding).is_err());
    }
}
