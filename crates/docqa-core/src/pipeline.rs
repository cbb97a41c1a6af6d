//! Ingestion and question-answering orchestration over the collaborator
//! traits.
//!
//! Both entry points are generic over [`Store`], [`Embedder`], and
//! [`TextGenerator`], so the app crate drives them with real providers and
//! SQLite while tests drive them with fakes and the in-memory store.
//!
//! # Ingestion
//!
//! ```text
//! body ──► Chunker ──► drop blank ──► embed (batches) ──► store doc + chunks
//! ```
//!
//! A batch whose embedding call fails, or an individual vector that comes
//! back empty or mis-sized, is skipped with a warning; the rest of the
//! document is still stored. The document and its chunks are written in
//! one all-or-nothing store call.
//!
//! # Answering
//!
//! ```text
//! question ──► embed (query) ──► vector_search ──► filter_noise ──► assemble_context
//!                                                                        │
//!                                             blank? ──► fixed answer ◄──┤
//!                                                                        ▼
//!                                                            prompt ──► generate
//! ```

use anyhow::{bail, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::chunk::{into_chunks, Chunker};
use crate::context::{assemble_context, DEFAULT_MAX_CONTEXT_CHARS};
use crate::embedding::{Embedder, EmbeddingTask};
use crate::generation::{build_prompt, TextGenerator, INSUFFICIENT_CONTEXT_ANSWER};
use crate::models::{Chunk, Document, RetrievedSegment};
use crate::noise::{filter_noise, DEFAULT_NOISE_THRESHOLD};
use crate::store::Store;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub source_name: String,
    /// Non-blank chunks produced by the chunker.
    pub chunks_total: usize,
    /// Chunks stored with a vector.
    pub chunks_stored: usize,
    /// Chunks dropped because embedding failed.
    pub chunks_skipped: usize,
}

/// Chunk, embed, and store one document's extracted text.
///
/// # Errors
///
/// Fails if the text yields no chunks, if no chunk could be embedded, or
/// if the store fails. Per-batch embedding failures are not errors.
pub async fn ingest_text(
    store: &dyn Store,
    chunker: &Chunker,
    embedder: &dyn Embedder,
    source_name: &str,
    content_type: &str,
    body: &str,
    batch_size: usize,
) -> Result<IngestReport> {
    let doc = new_document(source_name, content_type, body);
    let chunks = into_chunks(&doc.id, chunker.chunk(body).await?);
    if chunks.is_empty() {
        bail!("{} produced no text chunks", source_name);
    }
    let chunks_total = chunks.len();
    tracing::info!(
        source = source_name,
        chunks = chunks_total,
        splitter = chunker.splitter_name(),
        "chunked document"
    );

    let (kept, vectors) = embed_chunks(embedder, chunks, batch_size).await;
    let chunks_skipped = chunks_total - kept.len();
    if kept.is_empty() {
        bail!("no chunks of {} could be embedded", source_name);
    }

    let document_id = store
        .store_document(&doc, &kept, &vectors, embedder.model_name())
        .await?;

    tracing::info!(
        source = source_name,
        document_id = %document_id,
        stored = kept.len(),
        skipped = chunks_skipped,
        "stored document"
    );

    Ok(IngestReport {
        document_id,
        source_name: source_name.to_string(),
        chunks_total,
        chunks_stored: kept.len(),
        chunks_skipped,
    })
}

fn new_document(source_name: &str, content_type: &str, body: &str) -> Document {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());

    Document {
        id: Uuid::new_v4().to_string(),
        source_name: source_name.to_string(),
        content_type: content_type.to_string(),
        body: body.to_string(),
        dedup_hash: format!("{:x}", hasher.finalize()),
        created_at: chrono::Utc::now().timestamp(),
    }
}

/// Embed chunks batch by batch, returning the chunks that got a usable
/// vector alongside those vectors.
async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: Vec<Chunk>,
    batch_size: usize,
) -> (Vec<Chunk>, Vec<Vec<f32>>) {
    let dims = embedder.dims();
    let mut kept = Vec::with_capacity(chunks.len());
    let mut vectors = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let batch_vectors = match embedder.embed(&texts, EmbeddingTask::Document).await {
            Ok(v) if v.len() == batch.len() => v,
            Ok(v) => {
                tracing::warn!(
                    expected = batch.len(),
                    got = v.len(),
                    "embedding batch returned wrong vector count, skipping batch"
                );
                continue;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    first_chunk = batch[0].chunk_index,
                    size = batch.len(),
                    "embedding batch failed, skipping batch"
                );
                continue;
            }
        };

        for (chunk, vector) in batch.iter().zip(batch_vectors) {
            if vector.is_empty() || vector.len() != dims {
                tracing::warn!(
                    chunk_index = chunk.chunk_index,
                    got = vector.len(),
                    expected = dims,
                    "unusable embedding, skipping chunk"
                );
                continue;
            }
            kept.push(chunk.clone());
            vectors.push(vector);
        }
    }

    (kept, vectors)
}

/// Retrieval and context settings for one question.
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub top_k: usize,
    pub max_context_chars: usize,
    pub noise_threshold: f64,
    /// Restrict retrieval to one document's `source_name`.
    pub source_filter: Option<String>,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            source_filter: None,
        }
    }
}

/// A retrieved chunk that was offered to the model as context.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub source_name: String,
    pub chunk_index: i64,
    pub score: Option<f64>,
}

impl From<&RetrievedSegment> for SourceRef {
    fn from(seg: &RetrievedSegment) -> Self {
        Self {
            source_name: seg.source_name.clone(),
            chunk_index: seg.chunk_index,
            score: seg.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    /// Empty when the fixed insufficient-context answer was returned.
    pub sources: Vec<SourceRef>,
}

/// Answer `question` from the stored documents.
///
/// When retrieval yields no usable context the fixed
/// [`INSUFFICIENT_CONTEXT_ANSWER`] is returned and `generator` is never
/// called.
pub async fn answer_question(
    store: &dyn Store,
    embedder: &dyn Embedder,
    generator: &dyn TextGenerator,
    question: &str,
    opts: &AnswerOptions,
) -> Result<Answer> {
    let question = question.trim();
    if question.is_empty() {
        bail!("question must not be empty");
    }

    let query_vec = match embedder
        .embed(&[question.to_string()], EmbeddingTask::Query)
        .await?
        .into_iter()
        .next()
    {
        Some(v) if !v.is_empty() => v,
        _ => bail!("embedder returned no vector for the question"),
    };

    let candidates = store
        .vector_search(&query_vec, opts.top_k, opts.source_filter.as_deref())
        .await?;
    let retrieved = candidates.len();
    let mut segments = filter_noise(candidates, opts.noise_threshold);
    tracing::info!(
        retrieved,
        kept = segments.len(),
        top_k = opts.top_k,
        "retrieved context candidates"
    );

    let context = assemble_context(&segments, opts.max_context_chars);
    if context.trim().is_empty() {
        tracing::info!("no usable context, returning fixed answer");
        return Ok(Answer {
            answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
        });
    }

    let prompt = build_prompt(question, &context);
    tracing::debug!(
        context_chars = context.chars().count(),
        model = generator.model_name(),
        "generating answer"
    );
    let answer = generator.generate(&prompt).await?;

    segments.sort_by(RetrievedSegment::by_score_desc);
    Ok(Answer {
        answer,
        sources: segments.iter().map(SourceRef::from).collect(),
    })
}
