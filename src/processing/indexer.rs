//! Packaging chunk embeddings into vector store records.

use crate::{
    qdrant::{compute_chunk_hash, payload::current_timestamp_rfc3339},
    vector_store::{VectorRecord, VectorStore},
};
use serde_json::{Map, Value};

use super::types::{Embedding, PipelineError, TextChunk};

/// Deterministic record id for the chunk at `index`.
pub fn chunk_id(index: usize) -> String {
    format!("chunk_{index}")
}

/// Pair chunks with their embeddings into upsert-ready records.
///
/// Both slices must be in chunk-index order and of equal length.
pub fn build_records(chunks: &[TextChunk], embeddings: &[Embedding]) -> Vec<VectorRecord> {
    debug_assert_eq!(chunks.len(), embeddings.len());
    let indexed_at = current_timestamp_rfc3339();

    chunks
        .iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| {
            debug_assert_eq!(chunk.index, embedding.chunk_index);
            let mut payload = Map::new();
            payload.insert("text".into(), Value::String(chunk.text.clone()));
            payload.insert("chunk_index".into(), Value::from(chunk.index));
            payload.insert("word_count".into(), Value::from(chunk.word_count));
            payload.insert(
                "chunk_hash".into(),
                Value::String(compute_chunk_hash(&chunk.text)),
            );
            payload.insert("indexed_at".into(), Value::String(indexed_at.clone()));
            VectorRecord {
                id: chunk_id(chunk.index),
                vector: embedding.vector.clone(),
                payload,
            }
        })
        .collect()
}

/// Writes a run's chunk embeddings into a named collection.
pub struct VectorIndexer<'a> {
    store: &'a dyn VectorStore,
    collection: &'a str,
}

impl<'a> VectorIndexer<'a> {
    /// Bind the indexer to a store and collection.
    pub fn new(store: &'a dyn VectorStore, collection: &'a str) -> Self {
        Self { store, collection }
    }

    /// Ensure the collection exists and upsert every record in one batch.
    ///
    /// Returns the number of records written.
    pub async fn index(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Embedding],
    ) -> Result<usize, PipelineError> {
        let Some(dimension) = embeddings.first().map(|embedding| embedding.vector.len()) else {
            return Ok(0);
        };

        self.store
            .ensure_collection(self.collection, dimension)
            .await
            .map_err(|source| self.indexing_error(source))?;

        let records = build_records(chunks, embeddings);
        let written = self
            .store
            .upsert(self.collection, records)
            .await
            .map_err(|source| self.indexing_error(source))?;

        tracing::info!(
            collection = self.collection,
            records = written,
            dimension,
            "Chunk embeddings indexed"
        );
        Ok(written)
    }

    fn indexing_error(&self, source: crate::vector_store::VectorStoreError) -> PipelineError {
        tracing::error!(collection = self.collection, error = %source, "Indexing failed");
        PipelineError::Indexing {
            collection: self.collection.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::InMemoryVectorStore;

    fn fixture() -> (Vec<TextChunk>, Vec<Embedding>) {
        let chunks = vec![
            TextChunk {
                index: 0,
                text: "Revenue grew".into(),
                word_count: 2,
            },
            TextChunk {
                index: 1,
                text: "Margins fell".into(),
                word_count: 2,
            },
        ];
        let embeddings = vec![
            Embedding {
                chunk_index: 0,
                vector: vec![1.0, 0.0],
            },
            Embedding {
                chunk_index: 1,
                vector: vec![0.0, 1.0],
            },
        ];
        (chunks, embeddings)
    }

    #[test]
    fn records_use_chunk_ids_and_text_metadata() {
        let (chunks, embeddings) = fixture();
        let records = build_records(&chunks, &embeddings);
        assert_eq!(records[0].id, "chunk_0");
        assert_eq!(records[1].id, "chunk_1");
        assert_eq!(records[1].payload["text"], "Margins fell");
        assert_eq!(records[1].payload["chunk_index"], 1);
        assert_eq!(records[1].vector, vec![0.0, 1.0]);
        assert_eq!(
            records[0].payload["chunk_hash"],
            Value::String(compute_chunk_hash("Revenue grew"))
        );
    }

    #[tokio::test]
    async fn reindexing_same_chunks_keeps_id_set() {
        let store = InMemoryVectorStore::new();
        let indexer = VectorIndexer::new(&store, "reports");
        let (chunks, embeddings) = fixture();

        assert_eq!(indexer.index(&chunks, &embeddings).await.unwrap(), 2);
        assert_eq!(indexer.index(&chunks, &embeddings).await.unwrap(), 2);

        assert_eq!(
            store.ids("reports").await,
            vec!["chunk_0".to_string(), "chunk_1".to_string()]
        );
    }

    #[tokio::test]
    async fn store_failures_become_indexing_errors() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("reports", 3).await.unwrap();
        let (chunks, embeddings) = fixture();

        let error = VectorIndexer::new(&store, "reports")
            .index(&chunks, &embeddings)
            .await
            .unwrap_err();
        assert!(matches!(error, PipelineError::Indexing { collection, .. } if collection == "reports"));
    }
}
