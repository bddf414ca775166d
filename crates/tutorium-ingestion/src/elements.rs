//! Element classification over extracted page text.
//!
//! lopdf gives us a flat text stream per page; these heuristics recover the
//! structure a layout-aware partitioner would provide: headings, narrative
//! prose, and tabular blocks. Images are attached by the partitioner itself.

use lazy_static::lazy_static;
use regex::Regex;
use tutorium_common::Modality;

lazy_static! {
    /// "3", "3.2", "3.2.1" style section numbers followed by a word.
    static ref NUMBERED_HEADING: Regex = Regex::new(r"^\d+(\.\d+)*\.?\s+\S").unwrap();
    /// Column gap: two or more spaces, or a tab.
    static ref COLUMN_GAP: Regex = Regex::new(r"( {2,}|\t)").unwrap();
}

/// A structural element recovered from one page.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Title(String),
    NarrativeText(String),
    Table(String),
    /// Path of an exported image file.
    Image(String),
}

/// An element tagged with the page it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
    pub element: Element,
    pub page: u32,
}

/// A chunked content item ready for summarization.
///
/// `raw` is the chunk text for text/table items and the image file path for
/// image items — it doubles as the cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub modality: Modality,
    pub raw: String,
    pub page: Option<u32>,
}

/// Classify one page's extracted text into elements.
///
/// Blocks are separated by blank lines. A block is a table when enough of its
/// lines show aligned column gaps, a title when it is a single short
/// heading-shaped line, and narrative text otherwise.
pub fn classify_page_text(text: &str) -> Vec<Element> {
    let mut elements = Vec::new();

    for block in split_blocks(text) {
        if block.is_empty() {
            continue;
        }

        if looks_tabular(&block) {
            elements.push(Element::Table(block.join("\n")));
        } else if block.len() == 1 && is_title_line(block[0]) {
            elements.push(Element::Title(block[0].trim().to_string()));
        } else {
            let joined = block.join(" ").trim().to_string();
            if !joined.is_empty() {
                elements.push(Element::NarrativeText(joined));
            }
        }
    }

    elements
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn is_title_line(line: &str) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().count();
    if !(3..=80).contains(&len) {
        return false;
    }
    if trimmed.ends_with(['.', ',', ';', ':']) {
        return false;
    }

    if NUMBERED_HEADING.is_match(trimmed) {
        return true;
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() > 12 {
        return false;
    }

    let letters: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    if !letters.is_empty() && letters.iter().all(|c| c.is_uppercase()) {
        return true;
    }

    // Heading case: most words start with an uppercase letter.
    let capitalized = words.iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();
    capitalized * 10 >= words.len() * 6
}

fn looks_tabular(lines: &[&str]) -> bool {
    let gap_count = |line: &str| COLUMN_GAP.find_iter(line).count();

    if lines.len() == 1 {
        return gap_count(lines[0]) >= 3;
    }

    let columnar = lines.iter().filter(|l| gap_count(l) >= 2).count();
    columnar * 2 >= lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_heading_becomes_title() {
        let elements = classify_page_text("3.2 Laws of Refraction\n\nLight bends when it passes between media.");
        assert_eq!(elements[0], Element::Title("3.2 Laws of Refraction".to_string()));
        assert!(matches!(elements[1], Element::NarrativeText(_)));
    }

    #[test]
    fn test_all_caps_line_becomes_title() {
        let elements = classify_page_text("ACIDS AND BASES\n\nAn acid turns blue litmus red.");
        assert_eq!(elements[0], Element::Title("ACIDS AND BASES".to_string()));
    }

    #[test]
    fn test_sentence_is_not_a_title() {
        let elements = classify_page_text("This is an ordinary sentence about plants.");
        assert!(matches!(elements[0], Element::NarrativeText(_)));
    }

    #[test]
    fn test_aligned_columns_become_table() {
        let text = "Element    Symbol    Atomic number\nHydrogen   H         1\nHelium     He        2";
        let elements = classify_page_text(text);
        assert_eq!(elements.len(), 1);
        assert!(matches!(elements[0], Element::Table(_)));
    }

    #[test]
    fn test_paragraph_lines_join_into_one_element() {
        let text = "Photosynthesis is the process by which\ngreen plants make their own food\nusing sunlight.";
        let elements = classify_page_text(text);
        assert_eq!(elements.len(), 1);
        match &elements[0] {
            Element::NarrativeText(t) => assert!(t.contains("green plants make their own food")),
            other => panic!("expected narrative text, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_page_yields_nothing() {
        assert!(classify_page_text("\n   \n").is_empty());
    }
}
