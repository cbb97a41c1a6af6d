//! Sentence segmentation.
//!
//! The chunker never looks for sentence boundaries itself; it asks a
//! [`SentenceSplitter`]. Two strategies exist:
//!
//! - **[`UnicodeSentenceSplitter`]** (here): deterministic UAX #29 sentence
//!   boundaries via `unicode-segmentation`.
//! - **`LlmSentenceSplitter`** (app crate): asks a text-generation model
//!   to propose the boundaries.
//!
//! Both return trimmed, non-empty sentences in document order.

use anyhow::Result;
use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

/// Splits text into an ordered sequence of sentences.
#[async_trait]
pub trait SentenceSplitter: Send + Sync {
    /// Short identifier used in logs (e.g. `"unicode"`).
    fn name(&self) -> &str;

    /// Split `text` into trimmed, non-empty sentences.
    async fn split(&self, text: &str) -> Result<Vec<String>>;
}

/// Deterministic splitter based on Unicode sentence boundaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeSentenceSplitter;

#[async_trait]
impl SentenceSplitter for UnicodeSentenceSplitter {
    fn name(&self) -> &str {
        "unicode"
    }

    async fn split(&self, text: &str) -> Result<Vec<String>> {
        Ok(split_sentences(text))
    }
}

/// Split text on UAX #29 sentence boundaries.
///
/// Each sentence is trimmed; whitespace-only fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
