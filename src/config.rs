use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Default number of clusters requested from the clusterer.
pub const DEFAULT_NUM_CLUSTERS: usize = 5;
/// Default chunk size, in whitespace-delimited words.
pub const DEFAULT_CHUNK_SIZE: usize = 3000;
/// Default vector store collection receiving chunk embeddings.
pub const DEFAULT_COLLECTION_NAME: &str = "financial_report_embeddings";

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_EMBEDDING_CONCURRENCY: usize = 4;
const DEFAULT_GENERATION_CONCURRENCY: usize = 2;
const DEFAULT_OUTPUT_DIR: &str = "output";

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

/// Runtime configuration for the summarization pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of clusters requested per run (capped by the chunk count).
    pub num_clusters: usize,
    /// Chunk size measured in whitespace-delimited words.
    pub chunk_size: usize,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of vectors produced by the offline hash embedder.
    pub embedding_dimension: usize,
    /// Text-generation provider used by the summary composer.
    pub generation_provider: GenerationProvider,
    /// Chat model identifier passed to the generation provider.
    pub generation_model: String,
    /// API key for OpenAI-backed providers.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: String,
    /// Qdrant base URL; when absent an in-memory vector store is used.
    pub qdrant_url: Option<String>,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Collection receiving chunk embeddings.
    pub collection_name: String,
    /// Maximum number of embedding requests in flight.
    pub embedding_concurrency: usize,
    /// Maximum number of per-cluster summary requests in flight.
    pub generation_concurrency: usize,
    /// Directory receiving the rendered summaries.
    pub output_dir: String,
}

/// Supported embedding backends for the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hosted OpenAI embeddings API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic offline hash embedder.
    Hash,
}

/// Supported text-generation backends for the summary composer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationProvider {
    /// Hosted OpenAI chat completions API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let embedding_provider = match optional("EMBEDDING_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            None => EmbeddingProvider::OpenAI,
        };
        let generation_provider = match optional("GENERATION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("GENERATION_PROVIDER".to_string()))?,
            None => GenerationProvider::OpenAI,
        };

        let config = Self {
            num_clusters: parse_positive(&optional, "NUM_CLUSTERS", DEFAULT_NUM_CLUSTERS)?,
            chunk_size: parse_positive(&optional, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            embedding_provider,
            embedding_model: optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: parse_positive(
                &optional,
                "EMBEDDING_DIMENSION",
                DEFAULT_EMBEDDING_DIMENSION,
            )?,
            generation_provider,
            generation_model: optional("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ollama_url: optional("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            qdrant_url: optional("QDRANT_URL"),
            qdrant_api_key: optional("QDRANT_API_KEY"),
            collection_name: optional("COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            embedding_concurrency: parse_positive(
                &optional,
                "EMBEDDING_CONCURRENCY",
                DEFAULT_EMBEDDING_CONCURRENCY,
            )?,
            generation_concurrency: parse_positive(
                &optional,
                "GENERATION_CONCURRENCY",
                DEFAULT_GENERATION_CONCURRENCY,
            )?,
            output_dir: optional("OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        };

        if config.uses_openai() && config.openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        Ok(config)
    }

    /// Whether any configured provider talks to the OpenAI API.
    pub fn uses_openai(&self) -> bool {
        self.embedding_provider == EmbeddingProvider::OpenAI
            || self.generation_provider == GenerationProvider::OpenAI
    }
}

fn parse_positive<F>(optional: &F, key: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        },
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, if [`init_config`] has run.
pub fn get_config() -> Option<&'static Config> {
    CONFIG.get()
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        num_clusters = config.num_clusters,
        chunk_size = config.chunk_size,
        embedding_provider = ?config.embedding_provider,
        generation_provider = ?config.generation_provider,
        qdrant_url = ?config.qdrant_url,
        collection = %config.collection_name,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_api_key_is_set() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.num_clusters, 5);
        assert_eq!(config.chunk_size, 3000);
        assert_eq!(config.collection_name, "financial_report_embeddings");
        assert_eq!(config.embedding_provider, EmbeddingProvider::OpenAI);
        assert_eq!(config.generation_model, "gpt-4o-mini");
        assert!(config.qdrant_url.is_none());
    }

    #[test]
    fn openai_providers_require_api_key() {
        let error = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "OPENAI_API_KEY"));
    }

    #[test]
    fn local_providers_do_not_need_api_key() {
        let config = Config::from_lookup(lookup(&[
            ("EMBEDDING_PROVIDER", "hash"),
            ("GENERATION_PROVIDER", "Ollama"),
            ("NUM_CLUSTERS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.embedding_provider, EmbeddingProvider::Hash);
        assert_eq!(config.generation_provider, GenerationProvider::Ollama);
        assert_eq!(config.num_clusters, 3);
    }

    #[test]
    fn zero_and_garbage_counts_are_rejected() {
        let zero = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHUNK_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(zero, ConfigError::InvalidValue(key) if key == "CHUNK_SIZE"));

        let garbage = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("NUM_CLUSTERS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(garbage, ConfigError::InvalidValue(key) if key == "NUM_CLUSTERS"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let error = Config::from_lookup(lookup(&[("EMBEDDING_PROVIDER", "cohere")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "EMBEDDING_PROVIDER"));
    }
}
