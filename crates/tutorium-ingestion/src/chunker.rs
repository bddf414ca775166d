//! By-title chunker.
//!
//! Narrative text accumulates under the most recent heading; tables and
//! images pass through as standalone items.

use serde::{Deserialize, Serialize};
use tutorium_common::Modality;

use crate::elements::{ContentItem, Element, PageElement};

/// Configuration for the chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Hard upper bound on chunk size.
    #[serde(default = "default_max_characters")]
    pub max_characters: usize,
    /// A new title only starts a new chunk once the current one has this much.
    #[serde(default = "default_combine_text_under")]
    pub combine_text_under: usize,
    /// Soft break: a chunk is flushed once it grows past this.
    #[serde(default = "default_new_after")]
    pub new_after: usize,
}

fn default_max_characters()     -> usize { 10_000 }
fn default_combine_text_under() -> usize { 2_000 }
fn default_new_after()          -> usize { 6_000 }

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_characters:     default_max_characters(),
            combine_text_under: default_combine_text_under(),
            new_after:          default_new_after(),
        }
    }
}

/// Chunk a batch of page elements into retrieval-ready content items.
pub fn chunk_by_title(elements: Vec<PageElement>, config: &ChunkerConfig) -> Vec<ContentItem> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut buf_page: Option<u32> = None;

    for pe in elements {
        match pe.element {
            Element::Title(title) => {
                if buf.len() >= config.combine_text_under {
                    flush(&mut buf, &mut buf_page, &mut out);
                }
                append(&mut buf, &title, &mut buf_page, pe.page);
            }
            Element::NarrativeText(text) => {
                append(&mut buf, &text, &mut buf_page, pe.page);
                while buf.len() > config.max_characters {
                    let cut = split_boundary(&buf, config.max_characters);
                    let head = buf[..cut].trim().to_string();
                    let rest = buf[cut..].trim_start().to_string();
                    if !head.is_empty() {
                        out.push(ContentItem {
                            modality: Modality::Text,
                            raw: head,
                            page: buf_page,
                        });
                    }
                    buf = rest;
                }
                if buf.len() >= config.new_after {
                    flush(&mut buf, &mut buf_page, &mut out);
                }
            }
            Element::Table(table) => {
                flush(&mut buf, &mut buf_page, &mut out);
                out.push(ContentItem {
                    modality: Modality::Table,
                    raw: table,
                    page: Some(pe.page),
                });
            }
            Element::Image(path) => {
                out.push(ContentItem {
                    modality: Modality::Image,
                    raw: path,
                    page: Some(pe.page),
                });
            }
        }
    }

    flush(&mut buf, &mut buf_page, &mut out);
    out
}

fn append(buf: &mut String, text: &str, buf_page: &mut Option<u32>, page: u32) {
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf.push_str(text);
    if buf_page.is_none() {
        *buf_page = Some(page);
    }
}

fn flush(buf: &mut String, buf_page: &mut Option<u32>, out: &mut Vec<ContentItem>) {
    let text = std::mem::take(buf).trim().to_string();
    let page = buf_page.take();
    if !text.is_empty() {
        out.push(ContentItem {
            modality: Modality::Text,
            raw: text,
            page,
        });
    }
}

/// Largest split point at or under `max`, preferring whitespace and never
/// landing inside a UTF-8 code point.
fn split_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    match s[..idx].rfind(char::is_whitespace) {
        Some(ws) if ws > max / 2 => ws,
        _ => idx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str, page: u32) -> PageElement {
        PageElement { element: Element::NarrativeText(s.to_string()), page }
    }

    fn title(s: &str, page: u32) -> PageElement {
        PageElement { element: Element::Title(s.to_string()), page }
    }

    #[test]
    fn test_small_text_merges_across_titles() {
        let cfg = ChunkerConfig::default();
        let items = chunk_by_title(vec![
            title("Acids", 1),
            text("An acid turns blue litmus red.", 1),
            title("Bases", 2),
            text("A base turns red litmus blue.", 2),
        ], &cfg);
        // Under combine_text_under, both sections stay in a single chunk.
        assert_eq!(items.len(), 1);
        assert!(items[0].raw.contains("Acids"));
        assert!(items[0].raw.contains("Bases"));
        assert_eq!(items[0].page, Some(1));
    }

    #[test]
    fn test_title_starts_new_chunk_once_buffer_is_large() {
        let cfg = ChunkerConfig { max_characters: 10_000, combine_text_under: 50, new_after: 6_000 };
        let items = chunk_by_title(vec![
            title("Acids", 1),
            text("An acid turns blue litmus red and reacts with metals to give hydrogen gas.", 1),
            title("Bases", 2),
            text("A base turns red litmus blue.", 2),
        ], &cfg);
        assert_eq!(items.len(), 2);
        assert!(items[0].raw.starts_with("Acids"));
        assert!(items[1].raw.starts_with("Bases"));
    }

    #[test]
    fn test_long_text_splits_at_max_characters() {
        let cfg = ChunkerConfig { max_characters: 100, combine_text_under: 20, new_after: 80 };
        let long = "word ".repeat(100);
        let items = chunk_by_title(vec![text(&long, 3)], &cfg);
        assert!(items.len() > 1);
        assert!(items.iter().all(|i| i.raw.len() <= 100));
        assert!(items.iter().all(|i| i.modality == Modality::Text));
    }

    #[test]
    fn test_tables_and_images_pass_through() {
        let cfg = ChunkerConfig::default();
        let items = chunk_by_title(vec![
            text("Some prose before the table.", 4),
            PageElement { element: Element::Table("a  b\n1  2".to_string()), page: 4 },
            PageElement { element: Element::Image("data/images/book_p0004_0.jpg".to_string()), page: 4 },
        ], &cfg);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].modality, Modality::Text);
        assert_eq!(items[1].modality, Modality::Table);
        assert_eq!(items[2].modality, Modality::Image);
        assert_eq!(items[2].raw, "data/images/book_p0004_0.jpg");
    }

    #[test]
    fn test_split_boundary_respects_utf8() {
        let s = "ααααααααα";  // 2 bytes per char
        let cut = split_boundary(s, 5);
        assert!(s.is_char_boundary(cut));
    }
}
