//! In-memory vector index over a single document's chunks.
//!
//! A paper yields at most a few hundred chunks, so retrieval is an exhaustive cosine scan.
//! Exact duplicate chunks (repeated headers, footers, boilerplate) are stored once, keyed by a
//! SHA-256 digest of their text.

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::processing::Chunk;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;

/// Errors emitted while building or querying the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Embedding provider failed to return vectors.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Provider returned a different number of vectors than texts.
    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Texts submitted.
        expected: usize,
        /// Vectors returned.
        actual: usize,
    },
    /// Query vector dimension differs from the indexed vectors.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the indexed vectors.
        expected: usize,
        /// Dimension of the query vector.
        actual: usize,
    },
    /// Embedding provider returned no vector for the query.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
}

/// Chunk scored against a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query.
    pub score: f32,
}

struct IndexedChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Queryable index built from one document's chunks.
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    duplicates_skipped: usize,
}

impl VectorIndex {
    /// Embed `chunks` and build an index over them, keeping document order.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &(dyn EmbeddingClient + Send + Sync),
    ) -> Result<Self, IndexError> {
        let (unique, duplicates_skipped) = dedupe_chunks(chunks);
        if unique.is_empty() {
            return Ok(Self {
                entries: Vec::new(),
                duplicates_skipped,
            });
        }

        let texts = unique.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = embedder.generate_embeddings(texts).await?;
        if vectors.len() != unique.len() {
            return Err(IndexError::CountMismatch {
                expected: unique.len(),
                actual: vectors.len(),
            });
        }

        let entries = unique
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk { chunk, vector })
            .collect::<Vec<_>>();
        tracing::debug!(
            indexed = entries.len(),
            duplicates_skipped,
            "Built vector index"
        );

        Ok(Self {
            entries,
            duplicates_skipped,
        })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chunks dropped at build time because their text was already indexed.
    pub fn duplicates_skipped(&self) -> usize {
        self.duplicates_skipped
    }

    /// Return up to `k` chunks ranked by similarity to `query`.
    ///
    /// Equal scores keep document order.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        embedder: &(dyn EmbeddingClient + Send + Sync),
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = embedder.generate_embeddings(vec![query.to_string()]).await?;
        let query_vector = vectors.pop().ok_or(IndexError::EmptyEmbedding)?;
        let expected = self.entries[0].vector.len();
        if query_vector.len() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(&query_vector, &entry.vector)))
            .collect();
        scored.sort_by(|left, right| {
            right
                .1
                .partial_cmp(&left.1)
                .unwrap_or(Ordering::Equal)
                .then(left.0.cmp(&right.0))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, score)| ScoredChunk {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }
}

/// Remove duplicate chunks, keeping the first occurrence.
fn dedupe_chunks(chunks: Vec<Chunk>) -> (Vec<Chunk>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(chunks.len());
    let mut skipped = 0;

    for chunk in chunks {
        if chunk.content.trim().is_empty() {
            continue;
        }
        if seen.insert(compute_chunk_hash(&chunk.content)) {
            unique.push(chunk);
        } else {
            skipped += 1;
        }
    }

    (unique, skipped)
}

fn compute_chunk_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.trim().as_bytes()))
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use async_trait::async_trait;

    fn chunk(page: usize, content: &str) -> Chunk {
        Chunk {
            page,
            content: content.to_string(),
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts
                .iter()
                .map(|text| match text.as_str() {
                    "query" => vec![1.0, 0.0],
                    "near" => vec![0.9, 0.1],
                    "far" => vec![0.0, 1.0],
                    _ => vec![0.5, 0.5],
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn ranks_by_similarity_and_limits_to_k() {
        let index = VectorIndex::build(
            vec![chunk(1, "far"), chunk(2, "middle"), chunk(3, "near")],
            &FixedEmbedder,
        )
        .await
        .expect("index");

        let hits = index.retrieve("query", 2, &FixedEmbedder).await.expect("hits");
        let pages: Vec<usize> = hits.iter().map(|hit| hit.chunk.page).collect();
        assert_eq!(pages, vec![3, 2]);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn equal_scores_keep_document_order() {
        let index = VectorIndex::build(
            vec![chunk(4, "a"), chunk(5, "b"), chunk(6, "c")],
            &FixedEmbedder,
        )
        .await
        .expect("index");

        let hits = index.retrieve("query", 3, &FixedEmbedder).await.expect("hits");
        let pages: Vec<usize> = hits.iter().map(|hit| hit.chunk.page).collect();
        assert_eq!(pages, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn duplicate_chunks_are_indexed_once() {
        let embedder = HashingEmbedder::new(32);
        let index = VectorIndex::build(
            vec![
                chunk(1, "Journal of Results"),
                chunk(2, "Journal of Results"),
                chunk(2, "Body text"),
            ],
            &embedder,
        )
        .await
        .expect("index");

        assert_eq!(index.len(), 2);
        assert_eq!(index.duplicates_skipped(), 1);
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let embedder = HashingEmbedder::new(32);
        let index = VectorIndex::build(Vec::new(), &embedder).await.expect("index");
        assert!(index.is_empty());
        assert!(index.retrieve("query", 4, &embedder).await.expect("hits").is_empty());
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[3.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
