//! SQLite-backed [`Store`] implementation.
//!
//! Documents, chunks, and vectors live in the `documents`, `chunks`, and
//! `chunk_vectors` tables created by [`crate::migrate`]. Vector search
//! loads the candidate vectors and ranks them by cosine similarity in
//! process.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use docqa_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use docqa_core::models::{Chunk, Document, RetrievedSegment};
use docqa_core::store::{Store, StoreStats};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn has_document(&self, source_name: &str) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM chunks c
                JOIN documents d ON d.id = c.document_id
                WHERE d.source_name = ?
            )
            "#,
        )
        .bind(source_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn store_document(
        &self,
        doc: &Document,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
        model: &str,
    ) -> Result<String> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        let now = chrono::Utc::now().timestamp();

        // Dropped without commit on any error, which rolls everything back.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, source_name, content_type, body, dedup_hash,
                                   created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_name) DO UPDATE SET
                content_type = excluded.content_type,
                body = excluded.body,
                dedup_hash = excluded.dedup_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.source_name)
        .bind(&doc.content_type)
        .bind(&doc.body)
        .bind(&doc.dedup_hash)
        .bind(doc.created_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // An existing row keeps its first id.
        let doc_id: String = sqlx::query_scalar("SELECT id FROM documents WHERE source_name = ?")
            .bind(&doc.source_name)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
            .bind(&doc_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(&doc_id)
            .execute(&mut *tx)
            .await?;

        for (chunk, vector) in chunks.iter().zip(vectors) {
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&doc_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO chunk_vectors (chunk_id, document_id, model, dims, embedding)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&doc_id)
            .bind(model)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(doc_id)
    }

    async fn vector_search(
        &self,
        query_vec: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedSegment>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id AS chunk_id, c.chunk_index, c.text, d.source_name, cv.embedding
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            JOIN documents d ON d.id = c.document_id
            WHERE (? IS NULL OR d.source_name = ?)
              AND cv.dims = ?
            "#,
        )
        .bind(source_filter)
        .bind(source_filter)
        .bind(query_vec.len() as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut results: Vec<RetrievedSegment> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(query_vec, &blob_to_vec(&blob)) as f64;
                RetrievedSegment {
                    chunk_id: row.get("chunk_id"),
                    source_name: row.get("source_name"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    score: Some(score),
                }
            })
            .collect();

        results.sort_by(RetrievedSegment::by_score_desc);
        results.truncate(top_k);
        Ok(results)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let vectors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(StoreStats {
            documents,
            chunks,
            vectors,
        })
    }
}
