//! Hosted-inference summarization client with bounded retries.
//!
//! Each call walks attempts `0..max_retries`. Attempt `n` is bounded by
//! `initial_timeout * (n + 1)` units. A 503 or a warm-up payload waits and moves on, timeouts
//! and transport failures back off by `2^n` units, and anything else either returns the
//! summary or fails immediately.

use super::{RetryPolicy, SummarizationClient, SummarizationError};
use crate::config::Config;
use crate::progress::{AttemptOutcome, ProgressEvent, ProgressObserver, RetryAttempt, WaitReason};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Default summarization model on the hosted inference API.
pub const DEFAULT_API_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-xsum";

const MAX_ECHOED_BODY_CHARS: usize = 500;

/// Connection settings for [`HuggingFaceClient`].
#[derive(Debug, Clone)]
pub struct HuggingFaceSettings {
    /// Full model endpoint URL.
    pub api_url: String,
    /// Bearer token sent with every request.
    pub api_token: String,
    /// Attempt budget and timing.
    pub retry: RetryPolicy,
}

impl HuggingFaceSettings {
    /// Settings taken from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.hf_api_url.clone(),
            api_token: config.hf_api_token.clone(),
            retry: config.retry_policy(),
        }
    }
}

/// Summarization client for the hosted inference API.
pub struct HuggingFaceClient {
    http: Client,
    api_url: String,
    api_token: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

/// What a single attempt tells the retry loop to do next.
#[derive(Debug)]
enum Step {
    Done(String),
    Wait {
        reason: WaitReason,
        delay: Duration,
        cause: String,
    },
    Failed {
        timed_out: bool,
        message: String,
    },
    Fatal(SummarizationError),
}

impl HuggingFaceClient {
    /// Build a client, rejecting a blank token or an unusable retry policy up front.
    pub fn new(settings: HuggingFaceSettings) -> Result<Self, SummarizationError> {
        let HuggingFaceSettings {
            api_url,
            api_token,
            retry,
        } = settings;
        if api_token.trim().is_empty() {
            return Err(SummarizationError::MissingCredential);
        }
        retry.validate()?;

        let http = Client::builder().user_agent("papersum/summary").build()?;
        tracing::debug!(
            url = %api_url,
            max_retries = retry.max_retries,
            initial_timeout = retry.initial_timeout,
            "Initialized summarization client"
        );

        Ok(Self {
            http,
            api_url,
            api_token,
            retry,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationError> {
        Self::new(HuggingFaceSettings::from_config(config))
    }

    /// Retry policy applied to every call.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn attempt(
        &self,
        request: &InferenceRequest<'_>,
        attempt: u32,
        timeout: Duration,
        observer: &dyn ProgressObserver,
    ) -> Step {
        let response = match self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(request)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                return Step::Failed {
                    timed_out: error.is_timeout(),
                    message: error.to_string(),
                };
            }
        };

        let status = response.status();
        observer.on_event(&ProgressEvent::ResponseReceived {
            attempt,
            status: status.as_u16(),
        });

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Step::Wait {
                reason: WaitReason::ModelLoading,
                delay: self.retry.loading_delay(),
                cause: "model is still loading (HTTP 503)".into(),
            };
        }

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Step::Fatal(SummarizationError::HttpStatus {
                status,
                body: truncate_body(&body),
            });
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(error) => {
                return Step::Failed {
                    timed_out: error.is_timeout(),
                    message: error.to_string(),
                };
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => interpret_body(body, &self.retry),
            Err(_) => Step::Fatal(SummarizationError::UnexpectedResponse(truncate_body(
                &String::from_utf8_lossy(&bytes),
            ))),
        }
    }
}

#[async_trait]
impl SummarizationClient for HuggingFaceClient {
    async fn summarize(
        &self,
        prompt: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<String, SummarizationError> {
        let request = InferenceRequest { inputs: prompt };
        let max_retries = self.retry.max_retries;
        let mut last_cause = String::from("no attempt succeeded");

        for attempt in 0..max_retries {
            let timeout = self.retry.timeout_for(attempt);
            let is_last = attempt + 1 == max_retries;
            observer.on_event(&ProgressEvent::AttemptStarted {
                attempt,
                max_retries,
                timeout,
            });
            let finish = |outcome| {
                observer.on_event(&ProgressEvent::AttemptFinished(RetryAttempt {
                    attempt,
                    timeout,
                    outcome,
                }));
            };

            match self.attempt(&request, attempt, timeout, observer).await {
                Step::Done(summary) => {
                    finish(AttemptOutcome::Success);
                    tracing::info!(attempt = attempt + 1, "Summary received");
                    return Ok(summary);
                }
                Step::Fatal(error) => {
                    finish(AttemptOutcome::FatalError);
                    tracing::error!(attempt = attempt + 1, error = %error, "Summarization failed");
                    return Err(error);
                }
                Step::Wait {
                    reason,
                    delay,
                    cause,
                } => {
                    finish(AttemptOutcome::RetryableWait);
                    last_cause = cause;
                    // A 503 on the final attempt ends the loop without waiting. Warm-up
                    // hints are always honoured.
                    if is_last && reason == WaitReason::ModelLoading {
                        break;
                    }
                    observer.on_event(&ProgressEvent::Waiting {
                        attempt,
                        reason,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                }
                Step::Failed { timed_out, message } => {
                    observer.on_event(&ProgressEvent::RequestFailed {
                        attempt,
                        timed_out,
                        message: message.clone(),
                    });
                    finish(AttemptOutcome::RetryableError);
                    if is_last {
                        tracing::error!(attempts = max_retries, error = %message, "Retries exhausted");
                        return Err(if timed_out {
                            SummarizationError::TimedOut {
                                attempts: max_retries,
                            }
                        } else {
                            SummarizationError::Transport {
                                attempts: max_retries,
                                message,
                            }
                        });
                    }
                    let delay = self.retry.backoff_for(attempt);
                    observer.on_event(&ProgressEvent::Waiting {
                        attempt,
                        reason: WaitReason::Backoff,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }

        tracing::error!(attempts = max_retries, cause = %last_cause, "Retries exhausted");
        Err(SummarizationError::RetriesExhausted {
            attempts: max_retries,
            cause: last_cause,
        })
    }
}

/// Classify a 200 response body.
fn interpret_body(body: Value, retry: &RetryPolicy) -> Step {
    match body {
        Value::Array(items) => {
            let text = items.first().and_then(Value::as_object).and_then(|first| {
                first
                    .get("summary_text")
                    .or_else(|| first.get("generated_text"))
            });
            match text {
                Some(Value::String(text)) if !text.trim().is_empty() => Step::Done(text.clone()),
                _ => Step::Fatal(SummarizationError::UnexpectedResponse(truncate_body(
                    &Value::Array(items).to_string(),
                ))),
            }
        }
        Value::Object(map) if map.contains_key("error") => {
            let message = match map.get("error") {
                Some(Value::String(message)) => message.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            match map.get("estimated_time") {
                Some(estimate) => Step::Wait {
                    reason: WaitReason::WarmingUp,
                    delay: retry.warmup_delay(estimate.as_f64()),
                    cause: format!("model warming up: {message}"),
                },
                None => Step::Fatal(SummarizationError::Remote(message)),
            }
        }
        other => Step::Fatal(SummarizationError::UnexpectedResponse(truncate_body(
            &other.to_string(),
        ))),
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ECHOED_BODY_CHARS {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(MAX_ECHOED_BODY_CHARS).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;
    use std::sync::Mutex;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_timeout: 2_000,
            time_unit: Duration::from_millis(1),
        }
    }

    fn client_for(server: &MockServer) -> HuggingFaceClient {
        HuggingFaceClient::new(HuggingFaceSettings {
            api_url: server.url("/models/test"),
            api_token: "hf_test".into(),
            retry: fast_policy(),
        })
        .expect("client")
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ProgressObserver for Recorder {
        fn on_event(&self, event: &ProgressEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    impl Recorder {
        fn waits(&self) -> Vec<(WaitReason, Duration)> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    ProgressEvent::Waiting { reason, delay, .. } => Some((*reason, *delay)),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn interprets_summary_and_generated_text() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            interpret_body(json!([{"summary_text": "X"}]), &policy),
            Step::Done(text) if text == "X"
        ));
        assert!(matches!(
            interpret_body(json!([{"generated_text": "Y"}]), &policy),
            Step::Done(text) if text == "Y"
        ));
    }

    #[test]
    fn blank_or_missing_text_is_unexpected() {
        let policy = RetryPolicy::default();
        for body in [
            json!([]),
            json!([{"summary_text": "  "}]),
            json!([{"label": "x"}]),
            json!("plain"),
            json!({"summary_text": "not a list"}),
        ] {
            assert!(matches!(
                interpret_body(body, &policy),
                Step::Fatal(SummarizationError::UnexpectedResponse(_))
            ));
        }
    }

    #[test]
    fn error_payloads_split_on_estimated_time() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            interpret_body(json!({"error": "bad input"}), &policy),
            Step::Fatal(SummarizationError::Remote(message)) if message == "bad input"
        ));
        assert!(matches!(
            interpret_body(json!({"error": "loading", "estimated_time": 999}), &policy),
            Step::Wait { reason: WaitReason::WarmingUp, delay, .. } if delay == Duration::from_secs(30)
        ));
    }

    #[test]
    fn blank_token_is_rejected() {
        let error = HuggingFaceClient::new(HuggingFaceSettings {
            api_url: DEFAULT_API_URL.into(),
            api_token: "   ".into(),
            retry: RetryPolicy::default(),
        })
        .err()
        .expect("missing credential");
        assert!(matches!(error, SummarizationError::MissingCredential));
    }

    #[tokio::test]
    async fn sends_bearer_token_and_inputs() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/test")
                    .header("authorization", "Bearer hf_test")
                    .json_body(json!({"inputs": "Summarize"}));
                then.status(200).json_body(json!([{"summary_text": "X"}]));
            })
            .await;

        let summary = client_for(&server)
            .summarize("Summarize", &crate::progress::NoopObserver)
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "X");
    }

    #[tokio::test]
    async fn remote_error_fails_on_first_attempt() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/models/test");
                then.status(200).json_body(json!({"error": "bad input"}));
            })
            .await;

        let error = client_for(&server)
            .summarize("Summarize", &crate::progress::NoopObserver)
            .await
            .expect_err("remote error");

        assert_eq!(mock.hits_async().await, 1);
        assert!(matches!(error, SummarizationError::Remote(message) if message == "bad input"));
    }

    #[tokio::test]
    async fn unexpected_status_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/models/test");
                then.status(401).body("unauthorized");
            })
            .await;

        let error = client_for(&server)
            .summarize("Summarize", &crate::progress::NoopObserver)
            .await
            .expect_err("status error");

        assert_eq!(mock.hits_async().await, 1);
        match error {
            SummarizationError::HttpStatus { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn persistent_503_stops_after_budget() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/models/test");
                then.status(503).body("loading");
            })
            .await;
        let recorder = Recorder::default();

        let error = client_for(&server)
            .summarize("Summarize", &recorder)
            .await
            .expect_err("exhausted");

        assert_eq!(mock.hits_async().await, 3);
        assert!(error.is_retry_exhausted());
        assert!(error.to_string().contains("after all 3 retries"));
        let unit = fast_policy().time_unit;
        assert_eq!(
            recorder.waits(),
            vec![
                (WaitReason::ModelLoading, unit * 20),
                (WaitReason::ModelLoading, unit * 20),
            ]
        );
    }

    #[tokio::test]
    async fn warmup_hint_waits_capped_time_then_retries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/models/test");
                then.status(200)
                    .json_body(json!({"error": "loading", "estimated_time": 999}));
            })
            .await;
        let recorder = Recorder::default();

        let error = client_for(&server)
            .summarize("Summarize", &recorder)
            .await
            .expect_err("still warming");

        assert_eq!(mock.hits_async().await, 3);
        assert!(matches!(error, SummarizationError::RetriesExhausted { attempts: 3, .. }));
        let unit = fast_policy().time_unit;
        assert_eq!(recorder.waits(), vec![(WaitReason::WarmingUp, unit * 30); 3]);
    }

    #[tokio::test]
    async fn repeated_timeouts_report_exhaustion() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/models/test");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!([{"summary_text": "too late"}]));
            })
            .await;
        let client = HuggingFaceClient::new(HuggingFaceSettings {
            api_url: server.url("/models/test"),
            api_token: "hf_test".into(),
            retry: RetryPolicy {
                max_retries: 3,
                initial_timeout: 20,
                time_unit: Duration::from_millis(1),
            },
        })
        .expect("client");
        let recorder = Recorder::default();

        let error = client
            .summarize("Summarize", &recorder)
            .await
            .expect_err("timed out");

        assert_eq!(mock.hits_async().await, 3);
        assert!(matches!(error, SummarizationError::TimedOut { attempts: 3 }));
        assert!(error.to_string().contains("timed out after all"));
        let unit = Duration::from_millis(1);
        assert_eq!(
            recorder.waits(),
            vec![(WaitReason::Backoff, unit), (WaitReason::Backoff, unit * 2)]
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "z".repeat(MAX_ECHOED_BODY_CHARS + 10);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), MAX_ECHOED_BODY_CHARS + 1);
        assert!(truncated.ends_with('…'));
    }
}
