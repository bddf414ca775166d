//! Configuration loading for Tutorium.
//! Reads tutorium.toml from the current directory or path in TUTORIUM_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TutoriumError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "data/tutorium.db".to_string() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend kind: "ollama" or "openai_compatible".
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer key for OpenAI-compatible endpoints.
    /// Falls back to TUTORIUM_LLM_API_KEY when empty.
    #[serde(default)]
    pub api_key: String,
}

fn default_backend()  -> String { "ollama".to_string() }
fn default_base_url() -> String { "http://localhost:11434".to_string() }
fn default_model()    -> String { "llava:7b".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend:  default_backend(),
            base_url: default_base_url(),
            model:    default_model(),
            api_key:  String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embed_dim")]
    pub dim: usize,
    #[serde(default = "default_embed_batch")]
    pub batch_size: usize,
}

fn default_embed_dim()   -> usize { 4096 }
fn default_embed_batch() -> usize { 32 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model:      default_model(),
            dim:        default_embed_dim(),
            batch_size: default_embed_batch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Textbook PDFs ingested when none are given on the command line.
    #[serde(default)]
    pub pdf_paths: Vec<String>,
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
    #[serde(default = "default_pages_per_batch")]
    pub pages_per_batch: usize,
    /// Text/table summarization flush size.
    #[serde(default = "default_summary_batch")]
    pub summary_batch_size: usize,
    #[serde(default = "default_max_characters")]
    pub max_characters: usize,
    #[serde(default = "default_combine_text_under")]
    pub combine_text_under: usize,
    #[serde(default = "default_new_after")]
    pub new_after: usize,
}

fn default_image_dir()          -> String { "data/images".to_string() }
fn default_cache_file()         -> String { "data/cache.json".to_string() }
fn default_pages_per_batch()    -> usize  { 25 }
fn default_summary_batch()      -> usize  { 8 }
fn default_max_characters()     -> usize  { 10_000 }
fn default_combine_text_under() -> usize  { 2_000 }
fn default_new_after()          -> usize  { 6_000 }

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            pdf_paths:          Vec::new(),
            image_dir:          default_image_dir(),
            cache_file:         default_cache_file(),
            pages_per_batch:    default_pages_per_batch(),
            summary_batch_size: default_summary_batch(),
            max_characters:     default_max_characters(),
            combine_text_under: default_combine_text_under(),
            new_after:          default_new_after(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize { 5 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: default_top_k() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:3000".to_string() }

impl Default for WebConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Config {
    /// Load configuration from tutorium.toml.
    /// Checks TUTORIUM_CONFIG env var first, then the current directory.
    /// A missing file yields the built-in defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("TUTORIUM_CONFIG")
            .unwrap_or_else(|_| "tutorium.toml".to_string());

        if !Path::new(&path).exists() {
            tracing::debug!(path = %path, "No config file found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.llm.backend.as_str() {
            "ollama" | "openai_compatible" => {}
            other => {
                return Err(TutoriumError::Config(format!(
                    "unknown llm backend '{other}' (expected \"ollama\" or \"openai_compatible\")"
                )));
            }
        }
        if self.retrieval.top_k == 0 {
            return Err(TutoriumError::Config("retrieval.top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database:  DatabaseConfig::default(),
            llm:       LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            ingestion: IngestionConfig::default(),
            retrieval: RetrievalConfig::default(),
            web:       WebConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.ingestion.pages_per_batch, 25);
        assert_eq!(cfg.ingestion.summary_batch_size, 8);
        assert_eq!(cfg.ingestion.max_characters, 10_000);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.llm.model, "llava:7b");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [llm]
            model = "llava:13b"

            [ingestion]
            pdf_paths = ["data/class10_maths.pdf"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.llm.model, "llava:13b");
        assert_eq!(cfg.llm.backend, "ollama");
        assert_eq!(cfg.ingestion.pdf_paths.len(), 1);
        assert_eq!(cfg.ingestion.pages_per_batch, 25);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let cfg: Config = toml::from_str(
            r#"
            [llm]
            backend = "bedrock"
            "#,
        )
        .unwrap();
        assert!(cfg.validate().is_err());
    }
}
