//! # docqa
//!
//! Ask questions about your PDFs. Documents are extracted, split into
//! overlapping sentence-aligned chunks, embedded, and stored in SQLite.
//! Questions are answered by a language model from the most similar
//! chunks, with vector-like noise filtered out and the context held to a
//! character budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │ PDF/TXT  │──▶│ Chunk+Embed  │──▶│  SQLite  │
//! │ extract  │   │  (pipeline)  │   │ vectors  │
//! └──────────┘   └──────────────┘   └────┬─────┘
//!                                        │
//!                    ┌───────────────────┤
//!                    ▼                   ▼
//!               ┌──────────┐       ┌──────────┐
//!               │   CLI    │       │   HTTP   │
//!               │ (docqa)  │       │ (/ask)   │
//!               └──────────┘       └──────────┘
//! ```
//!
//! The I/O-free parts (chunker, noise filter, context assembly, the
//! collaborator traits, and the ingest/answer orchestration) live in the
//! `docqa-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`credentials`] | API keys from the environment / `.env` |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`embedding`] | Embedding providers (OpenAI, Ollama, Gemini, local) |
//! | [`generation`] | Text-generation providers |
//! | [`splitter`] | Model-assisted sentence splitting |
//! | [`sqlite_store`] | SQLite [`docqa_core::store::Store`] |
//! | [`ingest`] / [`ask`] | CLI commands |
//! | [`server`] | HTTP server |

pub mod ask;
pub mod config;
pub mod credentials;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod services;
pub mod splitter;
pub mod sqlite_store;
pub mod stats;
