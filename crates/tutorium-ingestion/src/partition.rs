//! Page-batched PDF partitioner.
//!
//! Loads a PDF once with lopdf, exports its embedded JPEG images up front,
//! and yields classified elements in batches of `pages_per_batch` pages.
//! All of this is blocking work; the pipeline drives it via `spawn_blocking`.

use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::elements::{classify_page_text, Element, PageElement};
use crate::error::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct PartitionConfig {
    pub pages_per_batch: usize,
    pub image_dir: PathBuf,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            pages_per_batch: 25,
            image_dir: PathBuf::from("data/images"),
        }
    }
}

pub struct PdfPartitioner {
    doc: Document,
    pages: Vec<u32>,
    images_by_page: HashMap<u32, Vec<PathBuf>>,
    title: Option<String>,
    cursor: usize,
    pages_per_batch: usize,
}

impl PdfPartitioner {
    /// Open a PDF for partitioning. Fails with `SourceNotFound` when the
    /// path does not exist. Creates the image output directory and exports
    /// embedded JPEG images immediately.
    pub fn open(pdf_path: &Path, config: &PartitionConfig) -> Result<Self> {
        if !pdf_path.exists() {
            return Err(IngestError::SourceNotFound(pdf_path.to_path_buf()));
        }

        std::fs::create_dir_all(&config.image_dir)?;

        let doc = Document::load(pdf_path)?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();

        let images_by_page = export_page_images(&doc, pdf_path, &config.image_dir);
        let n_images: usize = images_by_page.values().map(Vec::len).sum();
        debug!(
            path = %pdf_path.display(),
            pages = pages.len(),
            images = n_images,
            "PDF loaded"
        );

        let title = pages.first().and_then(|&first| {
            doc.extract_text(&[first]).ok().and_then(|t| guess_title(&t))
        });

        Ok(Self {
            doc,
            pages,
            images_by_page,
            title,
            cursor: 0,
            pages_per_batch: config.pages_per_batch.max(1),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Best-effort document title from the first page.
    pub fn title_guess(&self) -> Option<String> {
        self.title.clone()
    }

    /// Yield the next batch of classified elements, or None when all pages
    /// have been consumed.
    pub fn next_batch(&mut self) -> Option<Vec<PageElement>> {
        if self.cursor >= self.pages.len() {
            return None;
        }

        let end = (self.cursor + self.pages_per_batch).min(self.pages.len());
        let batch_pages = self.pages[self.cursor..end].to_vec();
        debug!(from = batch_pages[0], to = batch_pages[batch_pages.len() - 1], "Partitioning pages");

        let mut elements = Vec::new();
        for page in batch_pages {
            match self.doc.extract_text(&[page]) {
                Ok(text) => {
                    for element in classify_page_text(&text) {
                        elements.push(PageElement { element, page });
                    }
                }
                Err(e) => {
                    warn!(page, error = %e, "Page text extraction failed");
                }
            }
            if let Some(images) = self.images_by_page.get(&page) {
                for image in images {
                    elements.push(PageElement {
                        element: Element::Image(image.to_string_lossy().to_string()),
                        page,
                    });
                }
            }
        }

        self.cursor = end;
        Some(elements)
    }
}

/// First line long enough to be a plausible title.
fn guess_title(text: &str) -> Option<String> {
    text.lines()
        .find(|l| l.trim().len() > 10)
        .map(|l| l.trim().to_string())
}

// ── Image export ──────────────────────────────────────────────────────────────

/// Export every DCTDecode (JPEG) image XObject to the image directory,
/// keyed by the page that references it. Other filters would need
/// re-encoding and are skipped.
fn export_page_images(
    doc: &Document,
    pdf_path: &Path,
    image_dir: &Path,
) -> HashMap<u32, Vec<PathBuf>> {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "pdf".to_string());

    let mut by_page: HashMap<u32, Vec<PathBuf>> = HashMap::new();

    for (page_num, page_id) in doc.get_pages() {
        let Some(xobjects) = page_xobjects(doc, page_id) else { continue };

        let mut idx = 0usize;
        for (_name, entry) in xobjects.iter() {
            let Ok(object_id) = entry.as_reference() else { continue };
            let Ok(object) = doc.get_object(object_id) else { continue };
            let Ok(stream) = object.as_stream() else { continue };

            if !is_jpeg_image(&stream.dict) {
                continue;
            }

            let file_name = format!("{}_p{:04}_{}.jpg", stem, page_num, idx);
            let out_path = image_dir.join(&file_name);
            match std::fs::write(&out_path, &stream.content) {
                Ok(()) => {
                    by_page.entry(page_num).or_default().push(out_path);
                    idx += 1;
                }
                Err(e) => {
                    warn!(file = %out_path.display(), error = %e, "Image export failed");
                }
            }
        }
    }

    by_page
}

fn page_xobjects(doc: &Document, page_id: lopdf::ObjectId) -> Option<&Dictionary> {
    let page_dict = doc.get_object(page_id).ok()?.as_dict().ok()?;
    let resources = resolve_dict(doc, page_dict.get(b"Resources").ok()?)?;
    resolve_dict(doc, resources.get(b"XObject").ok()?)
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

fn is_jpeg_image(dict: &Dictionary) -> bool {
    let is_image = dict
        .get(b"Subtype")
        .and_then(|o| o.as_name())
        .map(|n| n == b"Image")
        .unwrap_or(false);
    if !is_image {
        return false;
    }

    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => {
            filters.len() == 1
                && matches!(&filters[0], Object::Name(name) if name == b"DCTDecode")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_pdf_is_source_not_found() {
        let cfg = PartitionConfig {
            pages_per_batch: 25,
            image_dir: std::env::temp_dir().join("tutorium-test-images"),
        };
        match PdfPartitioner::open(Path::new("data/no_such_book.pdf"), &cfg) {
            Err(IngestError::SourceNotFound(p)) => {
                assert_eq!(p, PathBuf::from("data/no_such_book.pdf"));
            }
            other => panic!("expected SourceNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_guess_title_skips_short_lines() {
        let text = "10\nScience\nStandard Ten — Term One\nChapter 1";
        assert_eq!(guess_title(text).as_deref(), Some("Standard Ten — Term One"));
    }

    #[test]
    fn test_jpeg_filter_detection() {
        let mut dict = Dictionary::new();
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        assert!(is_jpeg_image(&dict));

        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        assert!(!is_jpeg_image(&dict));

        let mut form = Dictionary::new();
        form.set("Subtype", Object::Name(b"Form".to_vec()));
        assert!(!is_jpeg_image(&form));
    }
}
