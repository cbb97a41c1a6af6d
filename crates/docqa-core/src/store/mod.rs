//! Storage abstraction for documents, chunks, and their vectors.
//!
//! The [`Store`] trait is everything ingestion and answering need from a
//! vector index, so the pipeline runs unchanged against SQLite (app crate)
//! or the [`memory::InMemoryStore`] used in tests.
//!
//! Documents are identified by `source_name`: storing a document whose
//! name is already present updates that record instead of adding another.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Chunk, Document, RetrievedSegment};

/// Row counts reported by `docqa stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub documents: i64,
    pub chunks: i64,
    pub vectors: i64,
}

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`has_document`](Store::has_document) | "Already processed" check by source name |
/// | [`store_document`](Store::store_document) | Write a document with its chunks and vectors |
/// | [`vector_search`](Store::vector_search) | Cosine similarity search |
/// | [`stats`](Store::stats) | Row counts |
#[async_trait]
pub trait Store: Send + Sync {
    /// Whether a document with this `source_name` has been stored with at
    /// least one chunk.
    async fn has_document(&self, source_name: &str) -> Result<bool>;

    /// Insert or update a document, keyed by `source_name`, and replace all
    /// of its chunks with `chunks`, storing `vectors[i]` for `chunks[i]`.
    ///
    /// All or nothing: on error the store is left as it was, so a failed
    /// write never makes a source look already processed.
    ///
    /// Returns the stored document's ID, which is the existing ID when the
    /// source was already present.
    ///
    /// # Errors
    ///
    /// Fails if the slices differ in length.
    async fn store_document(
        &self,
        doc: &Document,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
        model: &str,
    ) -> Result<String>;

    /// Return up to `top_k` chunks ranked by cosine similarity to
    /// `query_vec`, optionally limited to one `source_name`.
    async fn vector_search(
        &self,
        query_vec: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedSegment>>;

    async fn stats(&self) -> Result<StoreStats>;
}
