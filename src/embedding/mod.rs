use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

mod huggingface;

pub use huggingface::HuggingFaceEmbeddingClient;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Deterministic offline embedder based on signed feature hashing of lowercase words.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Construct an embedder producing vectors of `dimension` slots.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut slot = [0u8; 8];
            slot.copy_from_slice(&digest[..8]);
            let position = (u64::from_le_bytes(slot) % dimension as u64) as usize;
            // One bit of the digest picks the sign so collisions tend to cancel out.
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[position] += sign;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        tracing::debug!(
            dimension = self.dimension,
            count = texts.len(),
            "Generating hashing embeddings"
        );

        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let embeddings = texts
            .into_iter()
            .map(|text| Self::encode(&text, self.dimension))
            .collect();

        Ok(embeddings)
    }
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client(
    config: &Config,
) -> Result<Box<dyn EmbeddingClient + Send + Sync>, EmbeddingClientError> {
    match config.embedding_provider {
        EmbeddingProvider::Hashing => Ok(Box::new(HashingEmbedder::new(
            config.embedding_dimension,
        ))),
        EmbeddingProvider::HuggingFace => Ok(Box::new(HuggingFaceEmbeddingClient::new(
            config.embedding_endpoint(),
            config.hf_api_token.clone(),
        )?)),
    }
}
