//! PDF intro extraction.
//!
//! Pulls plain text from a bounded page window of a source paper,
//! skipping the title page, and runs each page through the cleaning
//! stages. Extraction failures are contained per document: a paper
//! that cannot be parsed yields an empty intro and the batch moves on.

use std::path::Path;

use lopdf::Document;
use thiserror::Error;

use crate::core::clean::{clean, strip_layout_artifacts};

/// Bounded page window for intro extraction.
///
/// The source papers put their literature review right after the title
/// page, so the default skips page 1 and reads up to 9 pages after it.
/// Both bounds are configuration, not constants: the window is a layout
/// heuristic and varies with the corpus.
#[derive(Debug, Clone)]
pub struct PageWindow {
    /// Leading pages to skip (title page, usually 1).
    pub skip_pages: usize,
    /// Maximum pages to read after the skipped ones.
    pub max_pages: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            skip_pages: 1,
            max_pages: 9,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open PDF: {0}")]
    Open(#[from] lopdf::Error),

    #[error("failed to extract text from page {page}: {source}")]
    Page { page: u32, source: lopdf::Error },
}

/// Extract the cleaned intro text for one paper.
///
/// Any parse or extraction error is logged with the document identity
/// and collapses to an empty string; a bad input never aborts the batch.
pub fn extract_intro(path: &Path, window: &PageWindow) -> String {
    match extract_window(path, window) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("{}: extraction failed: {e}", path.display());
            String::new()
        }
    }
}

fn extract_window(path: &Path, window: &PageWindow) -> Result<String, ExtractError> {
    // Document is dropped on every exit path, releasing the file handle.
    let doc = Document::load(path)?;
    let page_count = doc.get_pages().len();

    // Nothing after the title page: no intro to extract.
    if page_count <= window.skip_pages {
        return Ok(String::new());
    }

    // lopdf page numbers are 1-based.
    let first = (window.skip_pages + 1) as u32;
    let last = page_count.min(window.skip_pages + window.max_pages) as u32;
    if first > last {
        return Ok(String::new());
    }

    let mut pages = Vec::with_capacity((last - first + 1) as usize);
    for page_no in first..=last {
        let page_text = doc
            .extract_text(&[page_no])
            .map_err(|source| ExtractError::Page {
                page: page_no,
                source,
            })?;
        let cleaned = clean(&strip_layout_artifacts(&page_text));
        if !cleaned.is_empty() {
            pages.push(cleaned);
        }
    }

    Ok(pages.join(" "))
}
