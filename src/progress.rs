//! Structured progress reporting for the summarization pipeline.
//!
//! Every stage reports what it is doing through a [`ProgressObserver`] instead of writing to a
//! display directly. Observers only watch: nothing they do can change how a request proceeds,
//! so the retry loop stays testable without any rendering surface attached.

use std::time::Duration;

/// Classification of a finished attempt against the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The endpoint produced a usable summary.
    Success,
    /// The endpoint asked us to wait (model loading or warming up).
    RetryableWait,
    /// The request failed in a way that may clear up (timeout, transport error).
    RetryableError,
    /// The request failed permanently; no further attempts follow.
    FatalError,
}

/// Record of a single call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// Zero-based attempt index.
    pub attempt: u32,
    /// Timeout applied to this attempt.
    pub timeout: Duration,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
}

/// Why the client is sleeping before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// HTTP 503 while the hosted model loads.
    ModelLoading,
    /// Error payload carrying an `estimated_time` hint.
    WarmingUp,
    /// Exponential backoff after a timeout or transport failure.
    Backoff,
}

/// Progress notifications emitted while a document is summarized.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Text extraction finished.
    PagesExtracted {
        /// Number of pages produced by the extractor.
        pages: usize,
        /// First characters of the first page, if any.
        preview: Option<String>,
    },
    /// Chunking and indexing finished.
    ChunksIndexed {
        /// Chunks produced by the splitter.
        chunks: usize,
        /// Exact duplicates that were not indexed twice.
        duplicates_skipped: usize,
    },
    /// Retrieval for the summary query finished.
    ChunksRetrieved {
        /// Number of chunks returned by the index.
        retrieved: usize,
    },
    /// The prompt budget was applied.
    ContextPrepared {
        /// Chunks that fit in the budget.
        chunks: usize,
        /// Characters of paper text in the prompt.
        characters: usize,
    },
    /// A request is about to be sent.
    AttemptStarted {
        /// Zero-based attempt index.
        attempt: u32,
        /// Total attempts permitted.
        max_retries: u32,
        /// Timeout applied to this attempt.
        timeout: Duration,
    },
    /// The endpoint answered with an HTTP status.
    ResponseReceived {
        /// Zero-based attempt index.
        attempt: u32,
        /// HTTP status code.
        status: u16,
    },
    /// The request did not complete.
    RequestFailed {
        /// Zero-based attempt index.
        attempt: u32,
        /// Whether the failure was a timeout.
        timed_out: bool,
        /// Underlying error message.
        message: String,
    },
    /// The client is sleeping before the next attempt.
    Waiting {
        /// Zero-based index of the attempt that triggered the wait.
        attempt: u32,
        /// Cause of the wait.
        reason: WaitReason,
        /// Length of the wait.
        delay: Duration,
    },
    /// An attempt finished.
    AttemptFinished(RetryAttempt),
}

/// Receiver of [`ProgressEvent`]s.
pub trait ProgressObserver: Send + Sync {
    /// Called synchronously for each event in emission order.
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Observer that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PagesExtracted { pages, .. } => {
                tracing::info!(pages, "Extracted pages from PDF");
            }
            ProgressEvent::ChunksIndexed {
                chunks,
                duplicates_skipped,
            } => {
                tracing::info!(chunks, duplicates_skipped, "Indexed chunks");
            }
            ProgressEvent::ChunksRetrieved { retrieved } => {
                tracing::info!(retrieved, "Retrieved chunks for summarization");
            }
            ProgressEvent::ContextPrepared { chunks, characters } => {
                tracing::info!(chunks, characters, "Prepared prompt context");
            }
            ProgressEvent::AttemptStarted {
                attempt,
                max_retries,
                timeout,
            } => {
                tracing::info!(
                    attempt = attempt + 1,
                    max_retries,
                    timeout_secs = timeout.as_secs_f64(),
                    "Sending summarization request"
                );
            }
            ProgressEvent::ResponseReceived { attempt, status } => {
                tracing::debug!(attempt = attempt + 1, status, "Response received");
            }
            ProgressEvent::RequestFailed {
                attempt,
                timed_out,
                message,
            } => {
                tracing::warn!(attempt = attempt + 1, timed_out, error = %message, "Request failed");
            }
            ProgressEvent::Waiting {
                attempt,
                reason,
                delay,
            } => {
                tracing::info!(
                    attempt = attempt + 1,
                    reason = ?reason,
                    delay_secs = delay.as_secs_f64(),
                    "Waiting before retry"
                );
            }
            ProgressEvent::AttemptFinished(record) => {
                tracing::debug!(
                    attempt = record.attempt + 1,
                    outcome = ?record.outcome,
                    "Attempt finished"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_act_as_observers() {
        let seen = Mutex::new(Vec::new());
        let observer = |event: &ProgressEvent| seen.lock().unwrap().push(event.clone());
        observer.on_event(&ProgressEvent::ChunksRetrieved { retrieved: 3 });
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![ProgressEvent::ChunksRetrieved { retrieved: 3 }]
        );
    }
}
