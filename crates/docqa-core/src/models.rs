//! Core data models shared by the chunker, the stores, and the answer
//! pipeline.

use std::cmp::Ordering;

use serde::Serialize;

/// A source document after text extraction.
///
/// `source_name` is the document identifier used everywhere else (chunk
/// metadata, "already processed" checks, source filters). For files it is
/// the file name without its directory.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub source_name: String,
    pub content_type: String,
    pub body: String,
    pub dedup_hash: String,
    pub created_at: i64,
}

/// A chunk of a document's body text, the unit of embedding and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A chunk returned by similarity search, ready for context assembly.
///
/// Lives only for the duration of one query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedSegment {
    pub chunk_id: String,
    /// `source_name` of the document the chunk belongs to.
    pub source_name: String,
    pub chunk_index: i64,
    pub text: String,
    /// Similarity score, higher is more relevant. `None` ranks as `0.0`.
    pub score: Option<f64>,
}

impl RetrievedSegment {
    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }

    /// Comparator for `sort_by`: highest score first, missing scores as
    /// `0.0`. Incomparable scores are treated as equal, so a stable sort
    /// keeps their input order.
    pub fn by_score_desc(a: &Self, b: &Self) -> Ordering {
        b.score_or_zero()
            .partial_cmp(&a.score_or_zero())
            .unwrap_or(Ordering::Equal)
    }
}
