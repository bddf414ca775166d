//! tutorium-llm — LLM backend abstraction layer.
//!
//! One trait covers chat completion (text and vision) and embeddings; the
//! concrete backends speak to Ollama or any OpenAI-compatible endpoint.

pub mod backend;
pub mod prompts;

pub use backend::{
    build_backend, l2_normalize,
    ContentPart, ImageUrl, LlmBackend, LlmError, LlmRequest, LlmResponse,
    Message, MessageContent, OllamaBackend, OpenAiCompatibleBackend,
};
