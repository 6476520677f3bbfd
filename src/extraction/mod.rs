//! PDF text extraction.
//!
//! `pdf-extract` reads each page separately; pages are numbered from 1 in document order.
//! Pages with no text are kept so that numbering matches the source document.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while reading a document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The bytes are not a PDF the extractor understands.
    #[error("Failed to parse PDF: {0}")]
    Parse(String),
}

/// Text of a single page, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    /// One-based page number.
    pub page: usize,
    /// Extracted text, possibly empty.
    pub text: String,
}

/// Extract page texts from raw PDF bytes.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
    let texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|error| ExtractionError::Parse(error.to_string()))?;
    let pages = number_pages(texts);
    tracing::debug!(
        pages = pages.len(),
        characters = pages.iter().map(|page| page.text.chars().count()).sum::<usize>(),
        "Extracted PDF text"
    );
    Ok(pages)
}

/// Number per-page texts from 1, trimming surrounding whitespace.
pub fn number_pages(texts: Vec<String>) -> Vec<PageText> {
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| PageText {
            page: index + 1,
            text: text.trim().to_string(),
        })
        .collect()
}

/// First `max_chars` characters of the first page, for previews.
pub fn preview(pages: &[PageText], max_chars: usize) -> Option<String> {
    let first = pages.first()?;
    let mut preview: String = first.text.chars().take(max_chars).collect();
    if first.text.chars().count() > max_chars {
        preview.push_str("...");
    }
    Some(preview)
}
