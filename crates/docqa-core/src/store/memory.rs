//! In-memory [`Store`] implementation for tests and throwaway runs.
//!
//! `HashMap` and `Vec` behind `std::sync::RwLock`. Vector search is
//! brute-force cosine similarity over every stored vector.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, Document, RetrievedSegment};

use super::{Store, StoreStats};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// In-memory store.
pub struct InMemoryStore {
    /// Keyed by document ID.
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn has_document(&self, source_name: &str) -> Result<bool> {
        let docs = self.docs.read().map_err(poisoned)?;
        let stored = self.chunks.read().map_err(poisoned)?;
        Ok(stored.iter().any(|sc| {
            docs.get(&sc.chunk.document_id)
                .is_some_and(|d| d.source_name == source_name)
        }))
    }

    async fn store_document(
        &self,
        doc: &Document,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
        _model: &str,
    ) -> Result<String> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        let mut docs = self.docs.write().map_err(poisoned)?;
        let mut stored = self.chunks.write().map_err(poisoned)?;

        let id = docs
            .values()
            .find(|d| d.source_name == doc.source_name)
            .map(|d| d.id.clone())
            .unwrap_or_else(|| doc.id.clone());
        let mut record = doc.clone();
        record.id = id.clone();
        docs.insert(id.clone(), record);

        stored.retain(|sc| sc.chunk.document_id != id);
        for (c, v) in chunks.iter().zip(vectors) {
            let mut chunk = c.clone();
            chunk.document_id = id.clone();
            stored.push(StoredChunk {
                chunk,
                vector: v.clone(),
            });
        }
        Ok(id)
    }

    async fn vector_search(
        &self,
        query_vec: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedSegment>> {
        let docs = self.docs.read().map_err(poisoned)?;
        let stored = self.chunks.read().map_err(poisoned)?;

        let mut results: Vec<RetrievedSegment> = stored
            .iter()
            .filter_map(|sc| {
                let source_name = docs.get(&sc.chunk.document_id)?.source_name.clone();
                if source_filter.is_some_and(|f| f != source_name) {
                    return None;
                }
                Some(RetrievedSegment {
                    chunk_id: sc.chunk.id.clone(),
                    source_name,
                    chunk_index: sc.chunk.chunk_index,
                    text: sc.chunk.text.clone(),
                    score: Some(cosine_similarity(query_vec, &sc.vector) as f64),
                })
            })
            .collect();

        results.sort_by(RetrievedSegment::by_score_desc);
        results.truncate(top_k);
        Ok(results)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let docs = self.docs.read().map_err(poisoned)?;
        let stored = self.chunks.read().map_err(poisoned)?;
        Ok(StoreStats {
            documents: docs.len() as i64,
            chunks: stored.len() as i64,
            vectors: stored.iter().filter(|sc| !sc.vector.is_empty()).count() as i64,
        })
    }
}
