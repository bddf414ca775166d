//! Summary cache — avoids re-summarizing content across ingestion runs.
//!
//! Keys are the raw chunk text (text/table) or the image file path (image);
//! values are the previously computed summaries. The whole cache is one JSON
//! file loaded at the start of a run and saved at the end.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use tutorium_common::Modality;

use crate::error::Result;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SummaryCache {
    #[serde(default)]
    pub texts: HashMap<String, String>,
    #[serde(default)]
    pub tables: HashMap<String, String>,
    #[serde(default)]
    pub images: HashMap<String, String>,
}

impl SummaryCache {
    /// Load the cache from disk; a missing file yields an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the cache, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn contains(&self, modality: Modality, key: &str) -> bool {
        self.map(modality).contains_key(key)
    }

    pub fn insert(&mut self, modality: Modality, key: String, summary: String) {
        self.map_mut(modality).insert(key, summary);
    }

    pub fn len(&self) -> usize {
        self.texts.len() + self.tables.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn map(&self, modality: Modality) -> &HashMap<String, String> {
        match modality {
            Modality::Text => &self.texts,
            Modality::Table => &self.tables,
            Modality::Image => &self.images,
        }
    }

    fn map_mut(&mut self, modality: Modality) -> &mut HashMap<String, String> {
        match modality {
            Modality::Text => &mut self.texts,
            Modality::Table => &mut self.tables,
            Modality::Image => &mut self.images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trips_json_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = SummaryCache::default();
        cache.insert(Modality::Text, "raw chunk".to_string(), "its summary".to_string());
        cache.insert(Modality::Table, "a  b\n1  2".to_string(), "table summary".to_string());
        cache.insert(Modality::Image, "data/images/p1.jpg".to_string(), "image summary".to_string());
        cache.save(&path).unwrap();

        let loaded = SummaryCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.contains(Modality::Text, "raw chunk"));
        assert!(loaded.contains(Modality::Table, "a  b\n1  2"));
        assert_eq!(loaded.images.get("data/images/p1.jpg").map(String::as_str), Some("image summary"));
    }

    #[test]
    fn test_missing_file_loads_empty_cache() {
        let cache = SummaryCache::load("does/not/exist/cache.json").unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cache.json");
        SummaryCache::default().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_modalities_do_not_collide() {
        let mut cache = SummaryCache::default();
        cache.insert(Modality::Text, "same key".to_string(), "text summary".to_string());
        assert!(!cache.contains(Modality::Table, "same key"));
        assert!(cache.contains(Modality::Text, "same key"));
    }
}
