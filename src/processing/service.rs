//! Pipeline coordinating extraction, chunking, retrieval, and summarization.

use crate::{
    config::Config,
    embedding::{EmbeddingClient, get_embedding_client},
    extraction::{self, ExtractionError, PageText},
    index::VectorIndex,
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::chunk_pages,
        types::{DEFAULT_SUMMARY_QUERY, PipelineError, SummaryReport},
    },
    progress::{ProgressEvent, ProgressObserver},
    summarization::{
        DEFAULT_CONTEXT_MAX_CHARS, HuggingFaceClient, PromptContext, SummarizationClient,
    },
};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

const PREVIEW_CHARS: usize = 200;

/// Tunables applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Characters carried over between adjacent chunks.
    pub chunk_overlap: usize,
    /// Chunks retrieved for the summary query.
    pub top_k: usize,
    /// Character cap for paper text in the prompt.
    pub context_max_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k: 4,
            context_max_chars: DEFAULT_CONTEXT_MAX_CHARS,
        }
    }
}

impl PipelineSettings {
    /// Settings taken from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.text_splitter_chunk_size,
            chunk_overlap: config.text_splitter_chunk_overlap,
            top_k: config.retrieval_top_k,
            context_max_chars: config.summary_context_max_chars,
        }
    }
}

/// Per-request options supplied by a display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Retrieval query.
    pub query: String,
    /// Override for the number of retrieved chunks.
    pub top_k: Option<usize>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            query: DEFAULT_SUMMARY_QUERY.to_string(),
            top_k: None,
        }
    }
}

/// Runs one document from raw bytes to a summary.
///
/// The pipeline owns long-lived handles to the embedding and summarization clients and a
/// metrics registry, so the HTTP surface and the CLI reuse the same components. Requests
/// share no other state.
pub struct SummaryPipeline {
    embedder: Box<dyn EmbeddingClient + Send + Sync>,
    summarizer: Box<dyn SummarizationClient>,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Extract, index, retrieve, and summarize a PDF.
    async fn summarize_document(
        &self,
        bytes: Vec<u8>,
        options: SummaryOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<SummaryReport, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummaryPipeline {
    /// Assemble a pipeline from explicit components.
    pub fn new(
        embedder: Box<dyn EmbeddingClient + Send + Sync>,
        summarizer: Box<dyn SummarizationClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            summarizer,
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build the production pipeline from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        tracing::info!(provider = ?config.embedding_provider, "Initializing embedding client");
        let embedder =
            get_embedding_client(config).context("failed to initialize embedding client")?;
        let summarizer = HuggingFaceClient::from_config(config)
            .context("failed to initialize summarization client")?;
        Ok(Self::new(
            embedder,
            Box::new(summarizer),
            PipelineSettings::from_config(config),
        ))
    }

    /// Summarize pages that were already extracted.
    pub async fn summarize_pages(
        &self,
        pages: Vec<PageText>,
        options: SummaryOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<SummaryReport, PipelineError> {
        let outcome = self.run(pages, options, observer).await;
        match &outcome {
            Ok(report) => {
                self.metrics.record_summary(report.chunks as u64);
                tracing::info!(
                    pages = report.pages,
                    chunks = report.chunks,
                    context_chunks = report.context_chunks,
                    context_chars = report.context_chars,
                    "Document summarized"
                );
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::warn!(error = %error, "Document summary failed");
            }
        }
        outcome
    }

    async fn run(
        &self,
        pages: Vec<PageText>,
        options: SummaryOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<SummaryReport, PipelineError> {
        observer.on_event(&ProgressEvent::PagesExtracted {
            pages: pages.len(),
            preview: extraction::preview(&pages, PREVIEW_CHARS),
        });
        if pages.iter().all(|page| page.text.trim().is_empty()) {
            return Err(PipelineError::EmptyDocument);
        }

        let chunks = chunk_pages(
            &pages,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        )?;
        let chunk_count = chunks.len();
        let index = VectorIndex::build(chunks, self.embedder.as_ref()).await?;
        observer.on_event(&ProgressEvent::ChunksIndexed {
            chunks: chunk_count,
            duplicates_skipped: index.duplicates_skipped(),
        });

        let top_k = options.top_k.unwrap_or(self.settings.top_k);
        let retrieved = index
            .retrieve(&options.query, top_k, self.embedder.as_ref())
            .await?;
        observer.on_event(&ProgressEvent::ChunksRetrieved {
            retrieved: retrieved.len(),
        });
        if retrieved.is_empty() {
            return Err(PipelineError::NothingRetrieved);
        }

        let retrieved_chunks: Vec<_> = retrieved.into_iter().map(|hit| hit.chunk).collect();
        let context = PromptContext::from_chunks(&retrieved_chunks, self.settings.context_max_chars);
        observer.on_event(&ProgressEvent::ContextPrepared {
            chunks: context.len(),
            characters: context.total_chars(),
        });
        if context.is_empty() {
            return Err(PipelineError::ContextBudgetTooSmall {
                max_chars: self.settings.context_max_chars,
            });
        }

        let summary = self
            .summarizer
            .summarize(&context.to_prompt(), observer)
            .await?;

        Ok(SummaryReport {
            summary,
            pages: pages.len(),
            chunks: chunk_count,
            duplicates_skipped: index.duplicates_skipped(),
            retrieved: retrieved_chunks.len(),
            context_chunks: context.len(),
            context_chars: context.total_chars(),
        })
    }
}

#[async_trait]
impl PipelineApi for SummaryPipeline {
    async fn summarize_document(
        &self,
        bytes: Vec<u8>,
        options: SummaryOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<SummaryReport, PipelineError> {
        tracing::info!(bytes = bytes.len(), "Processing document");
        let extracted = tokio::task::spawn_blocking(move || extraction::extract_pages(&bytes))
            .await
            .map_err(|error| {
                ExtractionError::Parse(format!("extractor terminated unexpectedly: {error}"))
            })
            .and_then(|result| result);
        let pages = match extracted {
            Ok(pages) => pages,
            Err(error) => {
                self.metrics.record_failure();
                return Err(error.into());
            }
        };
        self.summarize_pages(pages, options, observer).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
