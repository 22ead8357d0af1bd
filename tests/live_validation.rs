use std::{env, sync::Once};

use finsum::{
    config,
    embedding::build_embedding_client,
    generation::{GenerationRequest, build_generation_client},
    processing::{Document, SummaryPipeline},
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() -> &'static config::Config {
    INIT.call_once(|| {
        set_default_env("QDRANT_URL", "http://127.0.0.1:6333");
        set_default_env("COLLECTION_NAME", "finsum-live");
        set_default_env("EMBEDDING_PROVIDER", "ollama");
        set_default_env("EMBEDDING_MODEL", "nomic-embed-text");
        set_default_env("GENERATION_PROVIDER", "ollama");
        set_default_env("GENERATION_MODEL", "llama3.2");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        config::init_config().expect("live configuration is valid");
    });
    config::get_config().expect("configuration initialized")
}

#[tokio::test]
#[ignore = "Requires live embedding provider"]
async fn live_embedding_roundtrip() {
    let config = init_config_once();
    let client = build_embedding_client(config).expect("embedding client builds");
    let vector = client
        .embed("finsum live embedding")
        .await
        .expect("failed to request embeddings from provider");
    assert!(!vector.is_empty(), "expected a non-empty embedding");
}

#[tokio::test]
#[ignore = "Requires live generation provider"]
async fn live_generation_roundtrip() {
    let config = init_config_once();
    let client = build_generation_client(config).expect("generation client builds");
    let summary = client
        .generate(GenerationRequest {
            instruction: "Summarize the financial reports for cluster 1:".into(),
            text: "Net sales rose 8% year over year to $94.9 billion.".into(),
        })
        .await
        .expect("failed to request a completion from provider");
    assert!(!summary.trim().is_empty());
}

#[tokio::test]
#[ignore = "Requires live Qdrant, embedding, and generation providers"]
async fn live_pipeline_summarizes_and_indexes() {
    let config = init_config_once();
    let pipeline = SummaryPipeline::from_config(config).expect("pipeline builds");
    let text = "BUSINESS OVERVIEW\nThe company designs consumer electronics.\nRevenue:\nNet sales were $94.9 billion, up 6% year over year.";

    let outcome = pipeline
        .run(vec![Document::new("live.txt", text)])
        .await
        .expect("pipeline run succeeds");
    assert_eq!(outcome.chunk_count, 1);
    assert_eq!(outcome.generation_calls, 3);

    let hits = pipeline
        .find_similar("net sales", 1)
        .await
        .expect("similarity query succeeds");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "chunk_0");
}
