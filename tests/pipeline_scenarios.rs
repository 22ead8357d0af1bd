use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use finsum::{
    embedding::{EmbeddingClient, EmbeddingClientError, HashEmbeddingClient},
    generation::{GenerationClient, GenerationClientError, GenerationRequest},
    processing::{
        Document, PipelineError, PipelineSettings, SummaryPipeline,
        compose::{COMPREHENSIVE_TEMPLATE, CONCISE_TEMPLATE},
    },
    vector_store::InMemoryVectorStore,
};

const COLLECTION: &str = "financial_report_embeddings";

#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
    instructions: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl GenerationClient for CountingGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.instructions
            .lock()
            .unwrap()
            .push(request.instruction.clone());
        Ok(format!("#### Summary {call}\n- {} words", request.text.split_whitespace().count()))
    }
}

/// Deterministic embedder that rejects any chunk starting with `fail_prefix`.
struct FlakyEmbedder {
    inner: HashEmbeddingClient,
    fail_prefix: &'static str,
}

#[async_trait]
impl EmbeddingClient for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        if text.starts_with(self.fail_prefix) {
            return Err(EmbeddingClientError::GenerationFailed(
                "service unavailable".into(),
            ));
        }
        self.inner.embed(text).await
    }

    fn model(&self) -> &str {
        "flaky"
    }
}

fn report(words: usize) -> Document {
    let text = (0..words)
        .map(|i| format!("w{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    Document::new("report.txt", text)
}

fn pipeline(
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<InMemoryVectorStore>,
    generator: Arc<CountingGenerator>,
) -> SummaryPipeline {
    SummaryPipeline::new(embedder, store, generator, PipelineSettings::default())
}

#[tokio::test]
async fn single_chunk_report_makes_three_generation_calls() {
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(CountingGenerator::default());
    let pipeline = pipeline(
        Arc::new(HashEmbeddingClient::new(32)),
        store.clone(),
        generator.clone(),
    );

    let outcome = pipeline.run(vec![report(2_999)]).await.unwrap();

    assert_eq!(outcome.chunk_count, 1);
    assert_eq!(outcome.cluster_count, 1);
    assert_eq!(outcome.generation_calls, 3);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.ids(COLLECTION).await, vec!["chunk_0".to_string()]);
    assert_eq!(outcome.cluster_summaries.len(), 1);
    assert!(!outcome.comprehensive_summary.is_empty());
    assert!(!outcome.concise_summary.is_empty());
}

#[tokio::test]
async fn cluster_count_is_capped_by_chunk_count() {
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(CountingGenerator::default());
    let pipeline = pipeline(
        Arc::new(HashEmbeddingClient::new(32)),
        store.clone(),
        generator.clone(),
    );

    let outcome = pipeline.run(vec![report(9_000)]).await.unwrap();

    assert_eq!(outcome.chunk_count, 3);
    assert_eq!(outcome.cluster_count, 3);
    assert_eq!(outcome.generation_calls, 5);
    assert_eq!(store.len(COLLECTION).await, 3);

    let instructions = generator.instructions.lock().unwrap();
    assert_eq!(instructions.len(), 5);
    assert!(
        instructions[..3]
            .iter()
            .all(|instruction| instruction.starts_with("Summarize the financial reports for cluster"))
    );
    assert_eq!(instructions[3], COMPREHENSIVE_TEMPLATE);
    assert_eq!(instructions[4], CONCISE_TEMPLATE);
}

#[tokio::test]
async fn embedding_failure_aborts_before_indexing() {
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(CountingGenerator::default());
    let embedder = Arc::new(FlakyEmbedder {
        inner: HashEmbeddingClient::new(32),
        fail_prefix: "w3000 ",
    });
    let pipeline = pipeline(embedder, store.clone(), generator.clone());

    let error = pipeline.run(vec![report(9_000)]).await.unwrap_err();

    assert!(matches!(
        error,
        PipelineError::EmbeddingService { chunk_index: 1, .. }
    ));
    assert!(!error.is_validation());
    assert_eq!(store.len(COLLECTION).await, 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.metrics_snapshot().runs_completed, 0);
}

#[tokio::test]
async fn rerunning_same_documents_keeps_chunk_ids() {
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(CountingGenerator::default());
    let pipeline = pipeline(
        Arc::new(HashEmbeddingClient::new(32)),
        store.clone(),
        generator,
    );

    let first = pipeline.run(vec![report(9_000)]).await.unwrap();
    let second = pipeline.run(vec![report(9_000)]).await.unwrap();

    assert_eq!(first.chunk_count, second.chunk_count);
    assert_eq!(first.cluster_count, second.cluster_count);
    assert_eq!(
        store.ids(COLLECTION).await,
        vec![
            "chunk_0".to_string(),
            "chunk_1".to_string(),
            "chunk_2".to_string()
        ]
    );
    assert_eq!(pipeline.metrics_snapshot().runs_completed, 2);
}

#[tokio::test]
async fn blank_document_is_a_validation_error() {
    let generator = Arc::new(CountingGenerator::default());
    let pipeline = pipeline(
        Arc::new(HashEmbeddingClient::new(32)),
        Arc::new(InMemoryVectorStore::new()),
        generator.clone(),
    );

    let error = pipeline
        .run(vec![report(10), Document::new("scan.txt", "   \n\t")])
        .await
        .unwrap_err();

    assert!(error.is_validation());
    assert!(error.to_string().contains("scan.txt"));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn similarity_search_returns_indexed_chunks() {
    let pipeline = pipeline(
        Arc::new(HashEmbeddingClient::new(32)),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(CountingGenerator::default()),
    );
    pipeline.run(vec![report(9_000)]).await.unwrap();

    let hits = pipeline.find_similar("w42 w43", 2).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
    assert!(hits.iter().all(|hit| hit.id.starts_with("chunk_")));
}
