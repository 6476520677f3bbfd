//! HTTP surface for the paper summarizer.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /summarize` – Upload raw PDF bytes; the server extracts, chunks, indexes, retrieves, and
//!   summarizes them. Optional query parameters: `query` (retrieval query, defaults to
//!   "Summarize this paper.") and `top_k` (number of retrieved chunks).
//! - `GET /metrics` – Observe summary counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Failures are returned as JSON carrying both the message and the full error chain.

use crate::processing::{PipelineApi, PipelineError, SummaryOptions, SummaryReport};
use crate::progress::TracingObserver;
use crate::summarization::SummarizationError;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::error::Error as _;
use std::sync::Arc;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/summarize", post(summarize_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Query parameters accepted by `POST /summarize`.
#[derive(Debug, Default, Deserialize)]
struct SummarizeParams {
    /// Optional retrieval query override.
    #[serde(default)]
    query: Option<String>,
    /// Optional number of chunks to retrieve.
    #[serde(default)]
    top_k: Option<usize>,
}

/// Summarize an uploaded PDF.
async fn summarize_document<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<SummarizeParams>,
    body: Bytes,
) -> Result<Json<SummaryReport>, AppError>
where
    S: PipelineApi,
{
    if body.is_empty() {
        return Err(AppError::BadRequest("request body must contain a PDF".into()));
    }

    let mut options = SummaryOptions::default();
    if let Some(query) = params.query.filter(|query| !query.trim().is_empty()) {
        options.query = query;
    }
    options.top_k = params.top_k;

    let report = service
        .summarize_document(body.to_vec(), options, &TracingObserver)
        .await?;
    tracing::info!(
        pages = report.pages,
        chunks = report.chunks,
        retrieved = report.retrieved,
        "Summarize request completed"
    );
    Ok(Json(report))
}

/// Return a snapshot of the summary counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Upload raw PDF bytes (Content-Type: application/pdf) and receive a structured summary. Optional query parameters: query, top_k.",
                request_example: Some(json!({
                    "query": "Summarize this paper.",
                    "top_k": 4
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summary counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Pipeline(PipelineError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(error) => match error {
                PipelineError::Extraction(_) | PipelineError::EmptyDocument => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PipelineError::Summarization(inner) if inner.is_retry_exhausted() => {
                    StatusCode::GATEWAY_TIMEOUT
                }
                PipelineError::Summarization(
                    SummarizationError::Remote(_)
                    | SummarizationError::UnexpectedResponse(_)
                    | SummarizationError::HttpStatus { .. },
                ) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, detail) = match &self {
            Self::BadRequest(message) => (message.clone(), Vec::new()),
            Self::Pipeline(error) => {
                let mut detail = Vec::new();
                let mut source = error.source();
                while let Some(cause) = source {
                    detail.push(cause.to_string());
                    source = cause.source();
                }
                (error.to_string(), detail)
            }
        };
        tracing::warn!(status = %status, error = %message, "Request failed");
        (
            status,
            Json(json!({
                "error": message,
                "detail": detail,
            })),
        )
            .into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}
