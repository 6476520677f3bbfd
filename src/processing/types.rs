//! Core data types and error definitions for the summarization pipeline.

use crate::{extraction::ExtractionError, index::IndexError, summarization::SummarizationError};
use serde::Serialize;
use thiserror::Error;

/// Query used to pick the chunks handed to the summarizer.
pub const DEFAULT_SUMMARY_QUERY: &str = "Summarize this paper.";

/// Ordered span of document text tagged with the page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// One-based page number of the source page.
    pub page: usize,
    /// Chunk text.
    pub content: String,
}

/// Errors produced while turning pages into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The configured chunk size cannot hold any text.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document could not be read.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// The document contained no extractable text.
    #[error("The document contains no extractable text")]
    EmptyDocument,
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Chunks could not be embedded or searched.
    #[error("Failed to index chunks: {0}")]
    Index(#[from] IndexError),
    /// Retrieval returned nothing usable for the prompt.
    #[error("No chunks were retrieved for the summary query")]
    NothingRetrieved,
    /// Not even the best-ranked chunk fits in the prompt budget.
    #[error("The top-ranked chunk does not fit in the {max_chars}-character prompt budget")]
    ContextBudgetTooSmall {
        /// Configured character cap.
        max_chars: usize,
    },
    /// The summarization endpoint failed terminally.
    #[error("Summary failed: {0}")]
    Summarization(#[from] SummarizationError),
}

/// Result of summarizing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    /// Summary text returned by the model.
    pub summary: String,
    /// Pages produced by the extractor.
    pub pages: usize,
    /// Chunks produced by the splitter.
    pub chunks: usize,
    /// Duplicate chunks that were indexed once.
    pub duplicates_skipped: usize,
    /// Chunks returned for the summary query.
    pub retrieved: usize,
    /// Retrieved chunks that fit in the prompt budget.
    pub context_chunks: usize,
    /// Characters of paper text sent to the model.
    pub context_chars: usize,
}
