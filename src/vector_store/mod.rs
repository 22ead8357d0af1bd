//! Vector store abstraction shared by the Qdrant adapter and the in-memory store.
//!
//! Collections hold `(id, vector, payload)` records. Writes are upserts keyed by `id`, so
//! re-indexing the same ids overwrites rather than duplicates.

mod memory;

use crate::qdrant::QdrantError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::InMemoryVectorStore;

/// Errors returned by vector store backends.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Qdrant transport or status failure.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// Record vector length disagrees with the collection.
    #[error("Vector dimension mismatch in '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Collection receiving the record.
        collection: String,
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Operation targeted a collection that does not exist.
    #[error("Collection not found: {0}")]
    MissingCollection(String),
}

/// Record written to a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Caller-assigned identifier; upserts are keyed by it.
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Arbitrary JSON metadata stored alongside the vector.
    pub payload: Map<String, Value>,
}

/// Ranked match returned by a similarity query.
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    /// Record identifier as written by the caller.
    pub id: String,
    /// Cosine similarity between the query and the stored vector.
    pub score: f32,
    /// Stored metadata.
    pub payload: Map<String, Value>,
}

impl ScoredMatch {
    /// Stored chunk text, when present.
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(Value::as_str)
    }
}

/// Interface implemented by vector store backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection when missing; existing collections are left untouched.
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError>;

    /// Insert or overwrite every record in a single batch.
    async fn upsert(
        &self,
        collection: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError>;

    /// Return up to `top_k` records ranked by similarity to `vector`.
    async fn query(
        &self,
        collection: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>, VectorStoreError>;
}
