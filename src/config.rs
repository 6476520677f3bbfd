use crate::summarization::{DEFAULT_API_URL, RetryPolicy};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const FEATURE_EXTRACTION_BASE_URL: &str =
    "https://api-inference.huggingface.co/pipeline/feature-extraction";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summarizer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token presented to the hosted inference API.
    pub hf_api_token: String,
    /// Summarization endpoint URL.
    pub hf_api_url: String,
    /// Number of attempts the summarization client may make.
    pub summary_max_retries: u32,
    /// Base per-attempt timeout in seconds; attempt `n` waits `n + 1` times as long.
    pub summary_initial_timeout_secs: u32,
    /// Character cap for the paper text embedded in the prompt.
    pub summary_context_max_chars: usize,
    /// Chunk size in characters.
    pub text_splitter_chunk_size: usize,
    /// Characters carried over from the previous chunk.
    pub text_splitter_chunk_overlap: usize,
    /// Embedding provider used to index chunks.
    pub embedding_provider: EmbeddingProvider,
    /// Hosted embedding model identifier.
    pub embedding_model: String,
    /// Optional override for the hosted embedding endpoint.
    pub embedding_api_url: Option<String>,
    /// Dimensionality of hashing embeddings.
    pub embedding_dimension: usize,
    /// Number of chunks retrieved for the summary query.
    pub retrieval_top_k: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends for the retrieval stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Offline feature-hashing embedder.
    Hashing,
    /// Hosted feature-extraction pipeline on the inference API.
    HuggingFace,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let hf_api_token = load_env("HF_API_TOKEN")?;
        if hf_api_token.trim().is_empty() {
            return Err(ConfigError::MissingVariable("HF_API_TOKEN".to_string()));
        }

        let summary_max_retries = parse_or("SUMMARY_MAX_RETRIES", 3)?;
        if summary_max_retries == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_MAX_RETRIES".to_string()));
        }

        let summary_initial_timeout_secs = parse_or("SUMMARY_INITIAL_TIMEOUT_SECS", 30)?;
        if summary_initial_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SUMMARY_INITIAL_TIMEOUT_SECS".to_string(),
            ));
        }

        let embedding_dimension = parse_or("EMBEDDING_DIMENSION", 384)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()));
        }

        let text_splitter_chunk_size = parse_or("TEXT_SPLITTER_CHUNK_SIZE", 1000)?;
        if text_splitter_chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_SIZE".to_string(),
            ));
        }

        Ok(Self {
            hf_api_token,
            hf_api_url: load_env_optional("HF_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            summary_max_retries,
            summary_initial_timeout_secs,
            summary_context_max_chars: parse_or("SUMMARY_CONTEXT_MAX_CHARS", 10_000)?,
            text_splitter_chunk_size,
            text_splitter_chunk_overlap: parse_or("TEXT_SPLITTER_CHUNK_OVERLAP", 100)?,
            embedding_provider: match load_env_optional("EMBEDDING_PROVIDER") {
                Some(value) => value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
                None => EmbeddingProvider::Hashing,
            },
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_api_url: load_env_optional("EMBEDDING_API_URL"),
            embedding_dimension,
            retrieval_top_k: parse_or("RETRIEVAL_TOP_K", 4)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Retry policy derived from the summary settings, measured in whole seconds.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.summary_max_retries,
            initial_timeout: self.summary_initial_timeout_secs,
            time_unit: Duration::from_secs(1),
        }
    }

    /// Hosted feature-extraction endpoint for the configured embedding model.
    pub fn embedding_endpoint(&self) -> String {
        self.embedding_api_url.clone().unwrap_or_else(|| {
            format!(
                "{FEATURE_EXTRACTION_BASE_URL}/{}",
                self.embedding_model.trim_matches('/')
            )
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            _ => Err(()),
        }
    }
}

/// Load `.env` if present and read the configuration from the environment.
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        api_url = %config.hf_api_url,
        max_retries = config.summary_max_retries,
        initial_timeout_secs = config.summary_initial_timeout_secs,
        embedding_provider = ?config.embedding_provider,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_provider_parses_known_names() {
        assert_eq!(
            "Hashing".parse::<EmbeddingProvider>(),
            Ok(EmbeddingProvider::Hashing)
        );
        assert_eq!(
            " huggingface ".parse::<EmbeddingProvider>(),
            Ok(EmbeddingProvider::HuggingFace)
        );
        assert!("word2vec".parse::<EmbeddingProvider>().is_err());
    }

    #[test]
    fn retry_policy_uses_second_units() {
        let config = Config {
            hf_api_token: "token".into(),
            hf_api_url: DEFAULT_API_URL.into(),
            summary_max_retries: 5,
            summary_initial_timeout_secs: 12,
            summary_context_max_chars: 10_000,
            text_splitter_chunk_size: 1000,
            text_splitter_chunk_overlap: 100,
            embedding_provider: EmbeddingProvider::Hashing,
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            embedding_api_url: None,
            embedding_dimension: 384,
            retrieval_top_k: 4,
            server_port: None,
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.timeout_for(1), Duration::from_secs(24));
        assert_eq!(
            config.embedding_endpoint(),
            "https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2"
        );
    }
}
