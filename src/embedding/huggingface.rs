//! Hosted feature-extraction embeddings.

use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Embedding client for the inference API's feature-extraction pipeline.
pub struct HuggingFaceEmbeddingClient {
    http: Client,
    endpoint: String,
    api_token: String,
}

impl HuggingFaceEmbeddingClient {
    /// Construct a client posting to `endpoint` with the given bearer token.
    pub fn new(endpoint: String, api_token: String) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("papersum/embeddings")
            .build()
            .map_err(|error| {
                EmbeddingClientError::GenerationFailed(format!(
                    "failed to build HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            endpoint,
            api_token,
        })
    }
}

#[async_trait]
impl EmbeddingClient for HuggingFaceEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }
        let expected = texts.len();
        tracing::debug!(endpoint = %self.endpoint, count = expected, "Requesting hosted embeddings");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&json!({
                "inputs": texts,
                "options": { "wait_for_model": true }
            }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::GenerationFailed(format!(
                    "failed to reach {}: {error}",
                    self.endpoint
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "embedding endpoint returned {status}: {body}"
            )));
        }

        let vectors: Vec<Vec<f32>> = response.json().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!(
                "failed to decode embedding response: {error}"
            ))
        })?;

        if vectors.len() != expected {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "expected {expected} embeddings, received {}",
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn decodes_sentence_embeddings() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/pipeline/feature-extraction/mini")
                    .header("authorization", "Bearer hf_test");
                then.status(200).json_body(json!([[0.1, 0.2], [0.3, 0.4]]));
            })
            .await;
        let client = HuggingFaceEmbeddingClient::new(
            server.url("/pipeline/feature-extraction/mini"),
            "hf_test".into(),
        )
        .expect("client");

        let vectors = client
            .generate_embeddings(vec!["a".into(), "b".into()])
            .await
            .expect("vectors");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn reports_count_mismatch() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!([[0.1, 0.2]]));
            })
            .await;
        let client =
            HuggingFaceEmbeddingClient::new(server.url("/embed"), "hf_test".into()).expect("client");

        let error = client
            .generate_embeddings(vec!["a".into(), "b".into()])
            .await
            .expect_err("mismatch");

        assert!(error.to_string().contains("expected 2 embeddings"));
    }

    #[tokio::test]
    async fn surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500).body("boom");
            })
            .await;
        let client =
            HuggingFaceEmbeddingClient::new(server.url("/embed"), "hf_test".into()).expect("client");

        let error = client
            .generate_embeddings(vec!["a".into()])
            .await
            .expect_err("status error");

        assert!(error.to_string().contains("500"));
    }
}
