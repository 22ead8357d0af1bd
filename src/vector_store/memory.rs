use super::{ScoredMatch, VectorRecord, VectorStore, VectorStoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    records: BTreeMap<String, (Vec<f32>, Map<String, Value>)>,
}

/// Process-local vector store used when no Qdrant endpoint is configured.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers currently stored in `collection`, sorted.
    pub async fn ids(&self, collection: &str) -> Vec<String> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|entry| entry.records.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of records stored in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|entry| entry.records.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        let mut guard = self.collections.write().await;
        guard
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                dimension,
                records: BTreeMap::new(),
            });
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError> {
        let mut guard = self.collections.write().await;
        let entry = guard
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::MissingCollection(collection.to_string()))?;

        if let Some(bad) = records
            .iter()
            .find(|record| record.vector.len() != entry.dimension)
        {
            return Err(VectorStoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: entry.dimension,
                actual: bad.vector.len(),
            });
        }

        let count = records.len();
        for record in records {
            entry
                .records
                .insert(record.id, (record.vector, record.payload));
        }
        Ok(count)
    }

    async fn query(
        &self,
        collection: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>, VectorStoreError> {
        let guard = self.collections.read().await;
        let entry = guard
            .get(collection)
            .ok_or_else(|| VectorStoreError::MissingCollection(collection.to_string()))?;

        let mut matches: Vec<ScoredMatch> = entry
            .records
            .iter()
            .map(|(id, (stored, payload))| ScoredMatch {
                id: id.clone(),
                score: cosine_similarity(&vector, stored),
                payload: payload.clone(),
            })
            .collect();
        matches.sort_by(|left, right| right.score.total_cmp(&left.score));
        matches.truncate(top_k);
        Ok(matches)
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() {
        return 0.0;
    }
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|v| v * v).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}
