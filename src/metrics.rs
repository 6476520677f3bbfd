use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_summarized: AtomicU64,
    chunks_indexed: AtomicU64,
    summary_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a summarized document and the number of chunks produced for it.
    pub fn record_summary(&self, chunk_count: u64) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a request that ended in a terminal failure.
    pub fn record_failure(&self) {
        self.summary_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            summary_failures: self.summary_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents summarized successfully since startup.
    pub documents_summarized: u64,
    /// Total chunks produced across successfully summarized documents.
    pub chunks_indexed: u64,
    /// Requests that ended in a terminal failure.
    pub summary_failures: u64,
}
