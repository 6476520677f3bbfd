//! Document processing pipeline: chunking, retrieval, and summarization orchestration.

pub mod chunking;
mod service;
pub mod types;

pub use chunking::chunk_pages;
pub use service::{PipelineApi, PipelineSettings, SummaryOptions, SummaryPipeline};
pub use types::{
    Chunk, ChunkingError, DEFAULT_SUMMARY_QUERY, PipelineError, SummaryReport,
};
