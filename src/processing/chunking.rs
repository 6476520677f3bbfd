//! Page-aware semantic chunking.
//!
//! Each page is split on its own so every chunk can cite the page it came from. Highlights:
//!
//! - Budget: `chunk_size` is measured in characters (default 1000), matching what the prompt
//!   budgeter counts downstream.
//! - Boundaries: `semchunk-rs` prefers paragraph, then sentence, then word boundaries. Any
//!   chunk it returns above the budget is re-split at whitespace before overlap is added.
//! - Overlap: the tail of the previous chunk on the same page (default 100 characters) is
//!   prepended so spans around a boundary stay visible to retrieval.

use super::types::{Chunk, ChunkingError};
use crate::extraction::PageText;
use semchunk_rs::Chunker;
use std::sync::Arc;

type TextCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Split pages into chunks that keep their page number.
///
/// Blank pages contribute no chunks. Chunks are returned in document order.
pub fn chunk_pages(
    pages: &[PageText],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let counter = character_counter();
    let mut chunks = Vec::new();
    for page in pages {
        if page.text.trim().is_empty() {
            continue;
        }
        chunks.extend(
            chunk_text_with_counter(&page.text, chunk_size, overlap, counter.clone())
                .into_iter()
                .filter(|content| !content.trim().is_empty())
                .map(|content| Chunk {
                    page: page.page,
                    content,
                }),
        );
    }

    tracing::debug!(
        pages = pages.len(),
        chunks = chunks.len(),
        chunk_size,
        overlap,
        "Chunked document"
    );
    Ok(chunks)
}

fn character_counter() -> TextCounter {
    Arc::new(|segment: &str| segment.chars().count())
}

fn chunk_text_with_counter(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    counter: TextCounter,
) -> Vec<String> {
    let counter_for_chunker = counter.clone();
    let chunker = Chunker::new(
        chunk_size,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );
    let base_chunks = enforce_budget(chunker.chunk(text), chunk_size, &counter);
    apply_overlap(base_chunks, chunk_size, overlap, &counter)
}

/// Re-split chunks the splitter left above `chunk_size`, cutting at the last whitespace that
/// fits and falling back to a hard cut inside long words.
fn enforce_budget(chunks: Vec<String>, chunk_size: usize, counter: &TextCounter) -> Vec<String> {
    let mut bounded = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if counter.as_ref()(&chunk) <= chunk_size {
            bounded.push(chunk);
            continue;
        }

        let mut rest = chunk.as_str();
        while counter.as_ref()(rest) > chunk_size {
            let limit = rest
                .char_indices()
                .nth(chunk_size)
                .map_or(rest.len(), |(offset, _)| offset);
            let cut = rest[..limit]
                .rfind(char::is_whitespace)
                .filter(|offset| *offset > 0)
                .unwrap_or(limit);
            let (head, tail) = rest.split_at(cut);
            let head = head.trim_end();
            if !head.is_empty() {
                bounded.push(head.to_string());
            }
            rest = tail.trim_start();
        }
        if !rest.trim().is_empty() {
            bounded.push(rest.to_string());
        }
    }
    bounded
}

/// Prepend the tail of the previous chunk to each chunk, trimming from the front so the
/// combined text never exceeds `chunk_size`.
fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    counter: &TextCounter,
) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if chunks.len() < 2 || effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;
    for current in chunks {
        let combined = match previous.as_deref() {
            Some(prior) => {
                build_overlapped_chunk(prior, &current, effective_overlap, chunk_size, counter)
            }
            None => current.clone(),
        };
        overlapped.push(combined);
        previous = Some(current);
    }

    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
    counter: &TextCounter,
) -> String {
    let tail = trim_front_to_budget(previous, overlap, counter);
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);

    if !tail.is_empty() {
        combined.push_str(tail);
        if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
            combined.push(' ');
        }
    }

    combined.push_str(current);
    trim_front_to_budget(&combined, chunk_size, counter).to_string()
}

/// Longest suffix of `text` (leading whitespace removed) that fits in `budget`.
fn trim_front_to_budget<'a>(text: &'a str, budget: usize, counter: &TextCounter) -> &'a str {
    if budget == 0 {
        return "";
    }

    let trimmed_text = text.trim_start();
    if counter.as_ref()(trimmed_text) <= budget {
        return trimmed_text;
    }

    for (offset, _) in text.char_indices().skip(1) {
        let trimmed = text[offset..].trim_start();
        if counter.as_ref()(trimmed) <= budget {
            return trimmed;
        }
    }

    ""
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars().next_back().is_some_and(char::is_whitespace)
}
