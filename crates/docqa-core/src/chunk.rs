//! Sentence-aware text chunker with overlap and oversize fallback.
//!
//! Splits document text into overlapping chunks of roughly `target_size`
//! characters without cutting sentences, then hard-splits anything that
//! still ends up far larger than the target (a single enormous sentence,
//! a table flattened by PDF extraction, ...).
//!
//! All sizes are counted in `char`s, and every cut lands on a `char`
//! boundary.
//!
//! # Algorithm
//!
//! 1. Ask the [`SentenceSplitter`] for trimmed sentences.
//! 2. Accumulate sentences into a buffer. Before appending one, if
//!    `buffer_len + sentence_len > target_size` and the buffer is not
//!    empty, close the buffer as a chunk (sentences joined by one space).
//! 3. Seed the next buffer with the last `overlap_size` characters of the
//!    closed chunk, trimmed (the whole chunk if it is shorter).
//! 4. Append the sentence; `buffer_len += sentence_len + 1`.
//! 5. Flush the final buffer.
//! 6. Any chunk longer than `target_size * 1.5` is re-split by raw
//!    character count into `ceil(len / (target_size - overlap_size))`
//!    equal, non-overlapping pieces.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("Hello world. Second sentence.", 500, 50);
//! assert_eq!(chunks, vec!["Hello world. Second sentence."]);
//! ```

use std::sync::Arc;

use anyhow::Result;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;
use crate::sentence::{split_sentences, SentenceSplitter, UnicodeSentenceSplitter};

/// Default chunk target size, in characters.
pub const DEFAULT_TARGET_SIZE: usize = 500;

/// Default overlap carried from one chunk into the next, in characters.
pub const DEFAULT_OVERLAP_SIZE: usize = 50;

/// Chunks longer than `target_size * OVERSIZE_FACTOR` get hard-split.
const OVERSIZE_FACTOR: f64 = 1.5;

/// Chunk `text` using deterministic Unicode sentence boundaries.
///
/// Returns an empty vector for empty or whitespace-only input. Every
/// returned string is non-empty and at most `target_size * 1.5` chars.
pub fn chunk_text(text: &str, target_size: usize, overlap_size: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    chunk_sentences(&split_sentences(text), target_size, overlap_size)
}

/// Run the accumulate/overlap/fallback algorithm over pre-split sentences.
///
/// Sentences are trimmed again here, so splitters that return padded
/// sentences still produce single-space joins.
pub fn chunk_sentences<S: AsRef<str>>(
    sentences: &[S],
    target_size: usize,
    overlap_size: usize,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer: Vec<String> = Vec::new();
    let mut buffer_len = 0usize;

    for sentence in sentences {
        let sentence = sentence.as_ref().trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence_len = char_len(sentence);

        if buffer_len + sentence_len > target_size && !buffer.is_empty() {
            let closed = buffer.join(" ");
            let carry = overlap_tail(&closed, overlap_size);
            chunks.push(closed);

            buffer.clear();
            buffer_len = char_len(&carry);
            if !carry.is_empty() {
                buffer.push(carry);
            }
        }

        buffer.push(sentence.to_string());
        buffer_len += sentence_len + 1;
    }

    if !buffer.is_empty() {
        chunks.push(buffer.join(" "));
    }

    chunks
        .into_iter()
        .flat_map(|chunk| split_oversized(chunk, target_size, overlap_size))
        .collect()
}

/// Trailing `overlap_size` chars of a closed chunk, trimmed.
fn overlap_tail(chunk: &str, overlap_size: usize) -> String {
    let total = char_len(chunk);
    let tail = if total > overlap_size {
        let start = chunk
            .char_indices()
            .nth(total - overlap_size)
            .map(|(i, _)| i)
            .unwrap_or(chunk.len());
        &chunk[start..]
    } else {
        chunk
    };
    tail.trim().to_string()
}

/// Hard-split a chunk that exceeds `target_size * 1.5`.
///
/// Pieces do not overlap and ignore sentence boundaries; their
/// concatenation is exactly the input.
fn split_oversized(chunk: String, target_size: usize, overlap_size: usize) -> Vec<String> {
    let len = char_len(&chunk);
    if len as f64 <= target_size as f64 * OVERSIZE_FACTOR {
        return vec![chunk];
    }

    // overlap_size >= target_size is rejected by config validation; fall
    // back to single-char stride rather than dividing by zero.
    let stride = target_size.saturating_sub(overlap_size).max(1);
    let num_pieces = len.div_ceil(stride);
    let piece_len = len.div_ceil(num_pieces);

    let chars: Vec<char> = chunk.chars().collect();
    chars
        .chunks(piece_len)
        .map(|piece| piece.iter().collect())
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Sentence-aware chunker bound to a splitting strategy and sizes.
///
/// Wraps [`chunk_sentences`] so that callers holding a configured
/// splitter (deterministic or model-assisted) do not care which one it is.
#[derive(Clone)]
pub struct Chunker {
    splitter: Arc<dyn SentenceSplitter>,
    target_size: usize,
    overlap_size: usize,
}

impl Chunker {
    pub fn new(splitter: Arc<dyn SentenceSplitter>, target_size: usize, overlap_size: usize) -> Self {
        Self {
            splitter,
            target_size,
            overlap_size,
        }
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    pub fn overlap_size(&self) -> usize {
        self.overlap_size
    }

    pub fn splitter_name(&self) -> &str {
        self.splitter.name()
    }

    /// Same splitter, different sizes. Used for per-request overrides.
    pub fn with_sizes(&self, target_size: usize, overlap_size: usize) -> Self {
        Self::new(self.splitter.clone(), target_size, overlap_size)
    }

    /// Split `text` into chunk strings.
    ///
    /// # Errors
    ///
    /// Only fails if the splitter does (the deterministic one never does).
    pub async fn chunk(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let sentences = self.splitter.split(text).await?;
        Ok(chunk_sentences(
            &sentences,
            self.target_size,
            self.overlap_size,
        ))
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(
            Arc::new(UnicodeSentenceSplitter),
            DEFAULT_TARGET_SIZE,
            DEFAULT_OVERLAP_SIZE,
        )
    }
}

/// Turn chunk strings into [`Chunk`] records for one document.
///
/// Whitespace-only pieces are dropped; the remaining chunks get
/// contiguous indices starting at 0.
pub fn into_chunks(document_id: &str, pieces: Vec<String>) -> Vec<Chunk> {
    pieces
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .enumerate()
        .map(|(i, text)| make_chunk(document_id, i as i64, text))
        .collect()
}

/// Create a single [`Chunk`] with a UUID and SHA-256 content hash.
fn make_chunk(document_id: &str, index: i64, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text,
        hash,
    }
}
