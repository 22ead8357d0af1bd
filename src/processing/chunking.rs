//! Word-window chunking and embedding token-budget checks.
//!
//! Chunks are contiguous windows of exactly `chunk_size` whitespace-delimited words (the last
//! window may be shorter), re-joined with single spaces. Boundaries depend only on the input and
//! `chunk_size`, so repeated runs produce identical chunks.
//!
//! Because the word budget knows nothing about the embedding model, [`TokenBudget`]
//! estimates each chunk's model tokens with `tiktoken-rs` and warns about chunks that exceed the
//! model's context window. The embedding provider stays the authority on rejection.

use crate::config::EmbeddingProvider;
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model, model::get_context_size};

use super::types::{PipelineError, TextChunk, TextStage};

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Split text into contiguous word windows of `chunk_size` words.
pub fn chunk_text(text: &str, chunk_size: usize) -> Result<Vec<TextChunk>, PipelineError> {
    if text.is_empty() {
        return Err(PipelineError::EmptyInput(TextStage::Chunk));
    }
    if chunk_size == 0 {
        return Err(PipelineError::InvalidChunkSize);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let chunks: Vec<TextChunk> = words
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, window)| TextChunk {
            index,
            text: window.join(" "),
            word_count: window.len(),
        })
        .collect();

    if chunks.is_empty() {
        return Err(PipelineError::NoChunks);
    }

    tracing::debug!(
        words = words.len(),
        chunk_size,
        chunks = chunks.len(),
        "Text chunked"
    );
    Ok(chunks)
}

/// Look up the embedding context window for a given provider/model combination.
pub(crate) fn embedding_context_window(provider: EmbeddingProvider, model: &str) -> usize {
    match provider {
        EmbeddingProvider::OpenAI => openai_embedding_context_window(model),
        EmbeddingProvider::Ollama => ollama_embedding_context_window(model),
        EmbeddingProvider::Hash => usize::MAX,
    }
}

fn openai_embedding_context_window(model: &str) -> usize {
    if model.starts_with("text-embedding-3") || model.starts_with("text-embedding-ada-002") {
        return 8192;
    }

    let size = get_context_size(model);
    if size == 4096 && model.contains("embedding") {
        tracing::debug!(model, "Using default embedding context window fallback");
    }
    size
}

fn ollama_embedding_context_window(model: &str) -> usize {
    let normalized = model.to_lowercase();
    match normalized.as_str() {
        "nomic-embed-text" | "mxbai-embed-large" | "mxbai-embed-large-v1" => 8192,
        value if value.contains("all-minilm") => 512,
        value if value.contains("e5-large") => 4096,
        _ => {
            tracing::trace!(model, "Using default Ollama context window estimate");
            4096
        }
    }
}

/// Token counter for the given provider/model.
///
/// Uses `tiktoken` encodings when they resolve and falls back to whitespace counting otherwise.
fn build_token_counter(provider: EmbeddingProvider, model: &str) -> TokenCounter {
    if provider == EmbeddingProvider::Hash {
        return whitespace_token_counter();
    }
    match resolve_encoding(model) {
        Ok(encoding) => {
            let encoding = Arc::new(encoding);
            Arc::new(move |segment: &str| encoding.encode_ordinary(segment).len())
        }
        Err(error) => {
            tracing::warn!(
                model,
                error = %error,
                "Tokenizer unavailable; falling back to whitespace counter"
            );
            whitespace_token_counter()
        }
    }
}

fn resolve_encoding(model: &str) -> anyhow::Result<CoreBPE> {
    let target = model.trim();
    match get_bpe_from_model(target) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model = target,
                error = %model_err,
                "Tokenizer model lookup failed; using 'cl100k_base'"
            );
            cl100k_base()
        }
    }
}

fn whitespace_token_counter() -> TokenCounter {
    Arc::new(|segment: &str| segment.split_whitespace().count())
}

/// Chunk that exceeds the embedding model's context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OversizedChunk {
    /// Index of the chunk.
    pub chunk_index: usize,
    /// Estimated model tokens.
    pub tokens: usize,
    /// Context window of the embedding model.
    pub window: usize,
}

/// Context window and token counter for one embedding model, built once per pipeline.
#[derive(Clone)]
pub struct TokenBudget {
    window: usize,
    counter: TokenCounter,
}

impl TokenBudget {
    /// Budget for `provider`'s `model`, or `None` when the provider has no context limit.
    pub fn new(provider: EmbeddingProvider, model: &str) -> Option<Self> {
        let window = embedding_context_window(provider, model);
        if window == usize::MAX {
            return None;
        }
        Some(Self {
            window,
            counter: build_token_counter(provider, model),
        })
    }

    /// Context window in model tokens.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Report chunks whose estimated token count exceeds the window.
    pub fn check(&self, chunks: &[TextChunk]) -> Vec<OversizedChunk> {
        let oversized: Vec<OversizedChunk> = chunks
            .iter()
            .filter_map(|chunk| {
                let tokens = self.counter.as_ref()(&chunk.text);
                (tokens > self.window).then_some(OversizedChunk {
                    chunk_index: chunk.index,
                    tokens,
                    window: self.window,
                })
            })
            .collect();

        for chunk in &oversized {
            tracing::warn!(
                chunk_index = chunk.chunk_index,
                tokens = chunk.tokens,
                window = chunk.window,
                "Chunk exceeds embedding context window"
            );
        }
        oversized
    }
}

impl std::fmt::Debug for TokenBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBudget")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

/// Report chunks whose estimated token count exceeds the embedding model's context window.
///
/// Builds a fresh [`TokenBudget`]; callers checking repeatedly should keep one around instead.
pub fn check_token_budget(
    chunks: &[TextChunk],
    provider: EmbeddingProvider,
    model: &str,
) -> Vec<OversizedChunk> {
    TokenBudget::new(provider, model)
        .map(|budget| budget.check(chunks))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn chunk_text_respects_chunk_size() {
        let chunks = chunk_text("one two three four five", 2).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["one two", "three four", "five"]);
        assert_eq!(chunks[2].word_count, 1);
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn chunk_count_is_ceiling_of_word_ratio() {
        for (count, size, expected) in [(10_000, 3000, 4), (9_000, 3000, 3), (2_999, 3000, 1)] {
            let chunks = chunk_text(&words(count), size).unwrap();
            assert_eq!(chunks.len(), expected, "{count} words / {size}");
            assert!(chunks.iter().all(|chunk| chunk.word_count <= size));
        }
    }

    #[test]
    fn chunks_reconstruct_token_sequence() {
        let text = "Revenue\n rose   8%.\nMargins\tcompressed due to input costs.";
        let chunks = chunk_text(text, 3).unwrap();
        let rejoined: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| chunk.text.split(' '))
            .collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = words(777);
        assert_eq!(chunk_text(&text, 100).unwrap(), chunk_text(&text, 100).unwrap());
    }

    #[test]
    fn empty_and_whitespace_inputs_fail() {
        assert!(matches!(
            chunk_text("", 3000),
            Err(PipelineError::EmptyInput(TextStage::Chunk))
        ));
        assert!(matches!(chunk_text(" \n\t", 3000), Err(PipelineError::NoChunks)));
        assert!(matches!(
            chunk_text("word", 0),
            Err(PipelineError::InvalidChunkSize)
        ));
    }

    #[test]
    fn token_budget_flags_oversized_chunks() {
        let chunks = chunk_text(&words(12), 5).unwrap();
        let budget = TokenBudget {
            window: 4,
            counter: whitespace_token_counter(),
        };
        let oversized = budget.check(&chunks);
        let indexes: Vec<usize> = oversized.iter().map(|chunk| chunk.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(oversized[0].tokens, 5);
    }

    #[test]
    fn hash_provider_has_no_budget() {
        let chunks = chunk_text(&words(50), 50).unwrap();
        assert!(TokenBudget::new(EmbeddingProvider::Hash, "hash").is_none());
        assert!(check_token_budget(&chunks, EmbeddingProvider::Hash, "hash").is_empty());
    }

    #[test]
    fn context_windows_for_known_models() {
        assert_eq!(
            embedding_context_window(EmbeddingProvider::OpenAI, "text-embedding-ada-002"),
            8192
        );
        assert_eq!(
            embedding_context_window(EmbeddingProvider::Ollama, "all-minilm-l6-v2"),
            512
        );
        assert_eq!(
            embedding_context_window(EmbeddingProvider::Ollama, "custom-model"),
            4096
        );
    }

    #[test]
    fn tiktoken_budget_accepts_default_sized_chunk() {
        let chunks = chunk_text(&words(200), 3000).unwrap();
        let oversized = check_token_budget(
            &chunks,
            EmbeddingProvider::OpenAI,
            "text-embedding-ada-002",
        );
        assert!(oversized.is_empty());
    }

    #[test]
    fn one_budget_checks_many_batches() {
        let budget = TokenBudget::new(EmbeddingProvider::Ollama, "all-minilm-l6-v2")
            .expect("ollama models have a window");
        assert_eq!(budget.window(), 512);

        let small = chunk_text(&words(100), 100).unwrap();
        let large = chunk_text(&words(2_000), 2_000).unwrap();
        assert!(budget.check(&small).is_empty());
        let oversized = budget.check(&large);
        assert_eq!(oversized.len(), 1);
        assert!(oversized[0].tokens > 512);
    }
}
