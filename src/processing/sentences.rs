//! Sentence re-flow of formatted text.

use super::types::{PipelineError, TextStage};
use unicode_segmentation::UnicodeSegmentation;

/// Sentence-boundary capability used by [`enhance_text`].
pub trait SentenceSegmenter: Send + Sync {
    /// Split `text` into sentences, preserving order.
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Segmenter backed by Unicode Standard Annex #29 sentence bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSegmenter;

impl SentenceSegmenter for UnicodeSentenceSegmenter {
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_sentence_bounds().collect()
    }
}

/// Re-flow text so every detected sentence sits on its own line.
///
/// Each sentence is trimmed and terminated by `\n`; whitespace-only fragments are skipped.
pub fn enhance_text(
    text: &str,
    segmenter: &dyn SentenceSegmenter,
) -> Result<String, PipelineError> {
    if text.is_empty() {
        return Err(PipelineError::EmptyInput(TextStage::Enhance));
    }

    let mut enhanced = String::with_capacity(text.len() + 16);
    let mut count = 0usize;
    for sentence in segmenter.sentences(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        enhanced.push_str(sentence);
        enhanced.push('\n');
        count += 1;
    }

    tracing::debug!(sentences = count, "Text enhanced");
    Ok(enhanced)
}
