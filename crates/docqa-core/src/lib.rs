//! # docqa core
//!
//! I/O-free logic for docqa: data models, sentence splitting, chunking,
//! noise filtering, context assembly, the collaborator traits
//! ([`embedding::Embedder`], [`generation::TextGenerator`],
//! [`store::Store`]), an in-memory store, and the ingest/answer
//! orchestration built on those traits.
//!
//! No sqlx, no HTTP clients, no filesystem access. Concrete providers and
//! the SQLite store live in the `docqa` app crate.

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod generation;
pub mod models;
pub mod noise;
pub mod pipeline;
pub mod sentence;
pub mod store;
