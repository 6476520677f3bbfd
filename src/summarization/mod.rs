//! Abstractions for producing a paper summary through a hosted text-generation endpoint.
//!
//! The pipeline hands a budgeted prompt (see [`prompt`]) to a [`SummarizationClient`]. The
//! hosted-inference implementation lives in [`huggingface`] and wraps each request in a bounded
//! retry loop driven by a [`RetryPolicy`].

pub mod huggingface;
pub mod prompt;

use crate::progress::ProgressObserver;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub use huggingface::{DEFAULT_API_URL, HuggingFaceClient, HuggingFaceSettings};
pub use prompt::{DEFAULT_CONTEXT_MAX_CHARS, PromptContext};

/// Units slept after an HTTP 503.
const MODEL_LOADING_WAIT_UNITS: u32 = 20;
/// Upper bound, in units, on a warm-up wait requested by the endpoint.
const MAX_WARMUP_WAIT_UNITS: f64 = 30.0;
/// Units assumed when a warm-up payload carries a non-numeric `estimated_time`.
const DEFAULT_WARMUP_WAIT_UNITS: f64 = 20.0;

/// Errors surfaced while requesting a summary.
#[derive(Debug, Error)]
pub enum SummarizationError {
    /// No bearer token was supplied.
    #[error("Missing API token for the summarization endpoint")]
    MissingCredential,
    /// Retry settings cannot produce a single attempt.
    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The endpoint returned an error payload without a warm-up hint.
    #[error("Hugging Face API error: {0}")]
    Remote(String),
    /// The endpoint returned a body we do not understand.
    #[error("Unexpected Hugging Face response format: {0}")]
    UnexpectedResponse(String),
    /// The endpoint answered with a status other than 200 or 503.
    #[error("Summarization endpoint returned {status}: {body}")]
    HttpStatus {
        /// Status reported by the endpoint.
        status: StatusCode,
        /// Response body, possibly empty.
        body: String,
    },
    /// Every attempt, including the last, timed out.
    #[error("API request timed out after all {attempts} retries. Please try again later.")]
    TimedOut {
        /// Attempts made.
        attempts: u32,
    },
    /// The final attempt failed at the transport level.
    #[error("API request failed after {attempts} attempts: {message}")]
    Transport {
        /// Attempts made.
        attempts: u32,
        /// Underlying transport error.
        message: String,
    },
    /// The attempt budget ran out while the endpoint kept asking us to wait.
    #[error("Failed to get summary after all {attempts} retries ({cause}). Please try again later.")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Most recent reason for retrying.
        cause: String,
    },
}

impl SummarizationError {
    /// Whether the failure came from running out of attempts rather than a hard error.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(
            self,
            Self::TimedOut { .. } | Self::Transport { .. } | Self::RetriesExhausted { .. }
        )
    }
}

/// Attempt budget and timing for the summarization retry loop.
///
/// Every delay is expressed in multiples of `time_unit` (one second in production), which keeps
/// the schedule identical while letting tests shrink it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of attempts permitted.
    pub max_retries: u32,
    /// Timeout of the first attempt, in units.
    pub initial_timeout: u32,
    /// Length of one unit.
    pub time_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_timeout: 30,
            time_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Timeout for zero-based `attempt`: `initial_timeout * (attempt + 1)` units.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.time_unit
            .saturating_mul(self.initial_timeout.saturating_mul(attempt.saturating_add(1)))
    }

    /// Backoff after a failed attempt: `2^attempt` units.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.time_unit.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Fixed wait after an HTTP 503.
    pub fn loading_delay(&self) -> Duration {
        self.time_unit.saturating_mul(MODEL_LOADING_WAIT_UNITS)
    }

    /// Wait requested by a warm-up payload, capped at 30 units.
    pub fn warmup_delay(&self, estimated_units: Option<f64>) -> Duration {
        let units = match estimated_units {
            Some(value) if value.is_nan() => MAX_WARMUP_WAIT_UNITS,
            Some(value) => value.clamp(0.0, MAX_WARMUP_WAIT_UNITS),
            None => DEFAULT_WARMUP_WAIT_UNITS,
        };
        Duration::from_nanos((self.time_unit.as_nanos() as f64 * units).round() as u64)
    }

    pub(crate) fn validate(&self) -> Result<(), SummarizationError> {
        if self.max_retries == 0 {
            return Err(SummarizationError::InvalidRetryPolicy(
                "max_retries must be at least 1".into(),
            ));
        }
        if self.initial_timeout == 0 || self.time_unit.is_zero() {
            return Err(SummarizationError::InvalidRetryPolicy(
                "initial timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Interface implemented by remote summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Produce a non-empty summary for `prompt`, reporting progress to `observer`.
    async fn summarize(
        &self,
        prompt: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<String, SummarizationError>;
}
