//! Summary pipeline coordinating text preparation, embedding, indexing, clustering, and
//! composition.

use crate::{
    config::{Config, EmbeddingProvider},
    embedding::{EmbeddingClient, build_embedding_client},
    generation::{GenerationClient, build_generation_client},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::{TokenBudget, chunk_text},
        clustering::{cluster_embeddings, uniform_dimension},
        compose::SummaryComposer,
        format::format_text,
        indexer::VectorIndexer,
        normalize::preprocess_text,
        sentences::{SentenceSegmenter, UnicodeSentenceSegmenter, enhance_text},
        types::{
            Document, Embedding, PipelineError, PipelineOutcome, PipelineSettings,
            PipelineSetupError, SearchError, SimilarChunk, TextChunk,
        },
    },
    qdrant::QdrantService,
    vector_store::{InMemoryVectorStore, VectorStore, VectorStoreError},
};
use futures_util::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;

/// Runs the full summarization flow over a batch of documents.
///
/// The pipeline owns shared handles to the embedding, generation, and vector store clients so
/// several runs (and similarity queries) can reuse them. Build it once and share it through an
/// `Arc` when needed.
pub struct SummaryPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerationClient>,
    segmenter: Arc<dyn SentenceSegmenter>,
    settings: PipelineSettings,
    token_budget: Option<TokenBudget>,
    metrics: Arc<PipelineMetrics>,
}

impl SummaryPipeline {
    /// Assemble a pipeline from injected clients.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn GenerationClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            segmenter: Arc::new(UnicodeSentenceSegmenter),
            settings,
            token_budget: None,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build clients from configuration.
    ///
    /// Uses Qdrant when `QDRANT_URL` is configured and an in-memory store otherwise.
    pub fn from_config(config: &Config) -> Result<Self, PipelineSetupError> {
        tracing::info!("Initializing pipeline clients");
        let embedder = build_embedding_client(config)?;
        let generator = build_generation_client(config)?;
        let store: Arc<dyn VectorStore> = match config.qdrant_url.as_deref() {
            Some(url) => {
                tracing::debug!(url, "Using Qdrant vector store");
                Arc::new(QdrantService::new(url, config.qdrant_api_key.clone())?)
            }
            None => {
                tracing::warn!("QDRANT_URL not set; chunk embeddings are kept in memory");
                Arc::new(InMemoryVectorStore::new())
            }
        };

        Ok(Self::new(embedder, store, generator, PipelineSettings::from(config))
            .with_token_budget(config.embedding_provider))
    }

    /// Replace the sentence segmenter used by the enhancement stage.
    pub fn with_segmenter(mut self, segmenter: Arc<dyn SentenceSegmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Share an existing metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Warn about chunks exceeding the context window of `provider`'s embedding model.
    pub fn with_token_budget(mut self, provider: EmbeddingProvider) -> Self {
        self.token_budget = TokenBudget::new(provider, self.embedder.model());
        self
    }

    /// Settings the pipeline runs with.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Summarize a batch of documents into comprehensive and concise summaries.
    pub async fn run(&self, documents: Vec<Document>) -> Result<PipelineOutcome, PipelineError> {
        let combined = combine_documents(&documents)?;
        tracing::info!(
            documents = documents.len(),
            chars = combined.len(),
            "Summarizing documents"
        );

        let chunks = self.prepare_chunks(&combined)?;
        let embeddings = self.embed_chunks(&chunks).await?;
        uniform_dimension(&embeddings)?;

        let indexed = VectorIndexer::new(self.store.as_ref(), &self.settings.collection)
            .index(&chunks, &embeddings)
            .await?;

        let assignment = cluster_embeddings(&embeddings, self.settings.num_clusters)?;
        let composer = SummaryComposer::new(
            Arc::clone(&self.generator),
            self.settings.generation_concurrency,
        );
        let composed = composer.compose(&chunks, &assignment).await?;

        self.metrics
            .record_run(chunks.len() as u64, composed.generation_calls as u64);
        self.metrics
            .record_chunk_size(self.settings.chunk_size as u64);
        tracing::info!(
            chunks = chunks.len(),
            clusters = assignment.k(),
            indexed,
            generation_calls = composed.generation_calls,
            "Run completed"
        );

        Ok(PipelineOutcome {
            comprehensive_summary: composed.comprehensive,
            concise_summary: composed.concise,
            cluster_summaries: composed.cluster_summaries,
            chunk_count: chunks.len(),
            cluster_count: assignment.k(),
            indexed,
            generation_calls: composed.generation_calls,
        })
    }

    /// Normalize, format, enhance, and chunk the combined text.
    pub fn prepare_chunks(&self, text: &str) -> Result<Vec<TextChunk>, PipelineError> {
        let lines = preprocess_text(text)?;
        let formatted = format_text(&lines)?;
        let enhanced = enhance_text(&formatted, self.segmenter.as_ref())?;
        let chunks = chunk_text(&enhanced, self.settings.chunk_size)?;

        if let Some(budget) = &self.token_budget {
            budget.check(&chunks);
        }
        Ok(chunks)
    }

    /// Embed every chunk, preserving chunk order.
    ///
    /// The first failure aborts the remaining requests; nothing is indexed for the run.
    pub async fn embed_chunks(
        &self,
        chunks: &[TextChunk],
    ) -> Result<Vec<Embedding>, PipelineError> {
        let concurrency = self.settings.embedding_concurrency.max(1);
        tracing::debug!(
            chunks = chunks.len(),
            concurrency,
            model = self.embedder.model(),
            "Embedding chunks"
        );

        let result: Result<Vec<Embedding>, PipelineError> =
            stream::iter(chunks.iter().map(|chunk| {
                let embedder = Arc::clone(&self.embedder);
                async move {
                    embedder
                        .embed(&chunk.text)
                        .await
                        .map(|vector| Embedding {
                            chunk_index: chunk.index,
                            vector,
                        })
                        .map_err(|source| PipelineError::EmbeddingService {
                            chunk_index: chunk.index,
                            source,
                        })
                }
            }))
            .buffered(concurrency)
            .try_collect()
            .await;

        if let Err(PipelineError::EmbeddingService {
            chunk_index,
            source,
        }) = &result
        {
            tracing::error!(chunk_index, error = %source, "Embedding failed");
            tracing::warn!(
                chunks = chunks.len(),
                collection = %self.settings.collection,
                "Run aborted before indexing; no chunks from this run were stored"
            );
        }
        result
    }

    /// Return the `top_k` stored chunks most similar to `query`.
    ///
    /// A collection that has never been indexed yields no matches.
    pub async fn find_similar(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SimilarChunk>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let vector = self.embedder.embed(query).await?;
        let collection = &self.settings.collection;
        let matches = match self.store.query(collection, vector, top_k.max(1)).await {
            Ok(matches) => matches,
            Err(VectorStoreError::MissingCollection(_)) => {
                tracing::debug!(collection = %collection, "Collection not indexed yet; no matches");
                Vec::new()
            }
            Err(source) => {
                return Err(SearchError::Store {
                    collection: collection.clone(),
                    source,
                });
            }
        };

        tracing::debug!(collection = %collection, hits = matches.len(), "Similarity query served");
        Ok(matches
            .into_iter()
            .map(|hit| SimilarChunk {
                text: hit.text().map(str::to_string),
                id: hit.id,
                score: hit.score,
            })
            .collect())
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Validate each document and join their texts, one trailing newline per document.
fn combine_documents(documents: &[Document]) -> Result<String, PipelineError> {
    if documents.is_empty() {
        return Err(PipelineError::Extraction {
            source_id: "<batch>".into(),
            reason: "no documents supplied".into(),
        });
    }

    let mut combined = String::new();
    for document in documents {
        if document.text.trim().is_empty() {
            tracing::warn!(source = %document.source_id, "Document has no extractable text");
            return Err(PipelineError::Extraction {
                source_id: document.source_id.clone(),
                reason: "document contains no text".into(),
            });
        }
        combined.push_str(&document.text);
        combined.push('\n');
    }
    Ok(combined)
}
