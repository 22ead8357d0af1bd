//! Core data types and error definitions for the summarization pipeline.

use crate::{
    config::{Config, DEFAULT_CHUNK_SIZE, DEFAULT_COLLECTION_NAME, DEFAULT_NUM_CLUSTERS},
    embedding::EmbeddingClientError,
    generation::GenerationClientError,
    processing::{clustering::ClusteringError, compose::SummaryStage},
    qdrant::QdrantError,
    vector_store::VectorStoreError,
};
use std::fmt;
use thiserror::Error;

/// Text-preparation stage that rejected blank input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStage {
    /// Whitespace collapsing and line splitting.
    Normalize,
    /// Heading/label marker rewriting.
    Format,
    /// Sentence re-flow.
    Enhance,
    /// Word-window chunking.
    Chunk,
}

impl fmt::Display for TextStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normalize => "preprocessing",
            Self::Format => "formatting",
            Self::Enhance => "sentence enhancement",
            Self::Chunk => "chunking",
        };
        f.write_str(name)
    }
}

/// Outward classification of pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input the caller can correct.
    Validation,
    /// Service or backend fault, reported with full detail.
    Unexpected,
}

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage received empty or whitespace-only input.
    #[error("Empty text provided for {0}")]
    EmptyInput(TextStage),
    /// Chunking was configured with a zero word budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Chunking produced no output.
    #[error("No chunks created from the text")]
    NoChunks,
    /// A source document yielded no usable text.
    #[error("Failed to extract text from {source_id}: {reason}")]
    Extraction {
        /// Identifier of the offending document.
        source_id: String,
        /// Human-readable cause.
        reason: String,
    },
    /// The embedding provider failed for a chunk.
    #[error("Failed to generate embeddings for chunk {chunk_index}: {source}")]
    EmbeddingService {
        /// Zero-based index of the chunk being embedded.
        chunk_index: usize,
        /// Provider error.
        #[source]
        source: EmbeddingClientError,
    },
    /// The vector store rejected the batch upsert.
    #[error("Failed to index chunks into '{collection}': {source}")]
    Indexing {
        /// Target collection.
        collection: String,
        /// Store error.
        #[source]
        source: VectorStoreError,
    },
    /// Embeddings could not be partitioned.
    #[error("Failed to cluster embeddings: {0}")]
    Clustering(#[from] ClusteringError),
    /// The text-generation provider failed.
    #[error("Failed to generate {stage} summary: {source}")]
    SummaryGeneration {
        /// Composer stage that issued the call.
        stage: SummaryStage,
        /// Provider error.
        #[source]
        source: GenerationClientError,
    },
}

impl PipelineError {
    /// Classify the error for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput(_)
            | Self::InvalidChunkSize
            | Self::NoChunks
            | Self::Extraction { .. } => ErrorKind::Validation,
            Self::EmbeddingService { .. }
            | Self::Indexing { .. }
            | Self::Clustering(_)
            | Self::SummaryGeneration { .. } => ErrorKind::Unexpected,
        }
    }

    /// Whether the caller can fix the failure by changing the input.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Errors emitted by similarity queries against the indexed chunks.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query text was empty or whitespace.
    #[error("Search query must not be empty")]
    EmptyQuery,
    /// The query could not be embedded.
    #[error("Failed to embed search query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The vector store rejected the query.
    #[error("Failed to query '{collection}': {source}")]
    Store {
        /// Queried collection.
        collection: String,
        /// Store error.
        #[source]
        source: VectorStoreError,
    },
}

/// Errors raised while wiring pipeline components from configuration.
#[derive(Debug, Error)]
pub enum PipelineSetupError {
    /// Embedding client construction failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Generation client construction failed.
    #[error(transparent)]
    Generation(#[from] GenerationClientError),
    /// Vector store client construction failed.
    #[error(transparent)]
    VectorStore(#[from] QdrantError),
}

/// Raw extracted text plus a source identifier.
#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier of the source (file name, URI).
    pub source_id: String,
    /// Extracted text.
    pub text: String,
}

impl Document {
    /// Build a document from any string-like parts.
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// Contiguous word window of the enhanced text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Zero-based position in the chunk sequence.
    pub index: usize,
    /// Space-joined words of the window.
    pub text: String,
    /// Number of words in `text`.
    pub word_count: usize,
}

/// Embedding vector for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Index of the chunk the vector belongs to.
    pub chunk_index: usize,
    /// Vector returned by the embedding provider.
    pub vector: Vec<f32>,
}

/// Tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Requested number of clusters (capped by the chunk count).
    pub num_clusters: usize,
    /// Chunk size in words.
    pub chunk_size: usize,
    /// Collection receiving chunk embeddings.
    pub collection: String,
    /// Maximum embedding requests in flight.
    pub embedding_concurrency: usize,
    /// Maximum per-cluster summary requests in flight.
    pub generation_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            num_clusters: DEFAULT_NUM_CLUSTERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            collection: DEFAULT_COLLECTION_NAME.to_string(),
            embedding_concurrency: 4,
            generation_concurrency: 2,
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            num_clusters: config.num_clusters,
            chunk_size: config.chunk_size,
            collection: config.collection_name.clone(),
            embedding_concurrency: config.embedding_concurrency,
            generation_concurrency: config.generation_concurrency,
        }
    }
}

/// Result of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Two-page comprehensive summary.
    pub comprehensive_summary: String,
    /// One-page concise summary.
    pub concise_summary: String,
    /// Per-cluster summaries in cluster-id order (skipped clusters omitted).
    pub cluster_summaries: Vec<String>,
    /// Number of chunks produced.
    pub chunk_count: usize,
    /// Effective number of clusters.
    pub cluster_count: usize,
    /// Number of records upserted into the collection.
    pub indexed: usize,
    /// Number of text-generation calls issued.
    pub generation_calls: usize,
}

/// Ranked chunk returned by a similarity query.
#[derive(Debug, Clone)]
pub struct SimilarChunk {
    /// Record identifier (`chunk_<i>`).
    pub id: String,
    /// Similarity score reported by the store.
    pub score: f32,
    /// Stored chunk text, when available.
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_validation_failures() {
        assert!(PipelineError::EmptyInput(TextStage::Chunk).is_validation());
        assert!(PipelineError::NoChunks.is_validation());
        assert!(
            PipelineError::Extraction {
                source_id: "a.txt".into(),
                reason: "empty".into()
            }
            .is_validation()
        );
    }

    #[test]
    fn backend_errors_are_unexpected() {
        let error = PipelineError::SummaryGeneration {
            stage: SummaryStage::Concise,
            source: GenerationClientError::GenerationFailed("boom".into()),
        };
        assert_eq!(error.kind(), ErrorKind::Unexpected);
        assert!(error.to_string().contains("concise"));
    }

    #[test]
    fn empty_input_message_names_stage() {
        let message = PipelineError::EmptyInput(TextStage::Enhance).to_string();
        assert_eq!(message, "Empty text provided for sentence enhancement");
    }
}
