//! The collaborators a command or request needs, built once from config.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use docqa_core::chunk::Chunker;
use docqa_core::embedding::Embedder;
use docqa_core::generation::TextGenerator;
use docqa_core::store::Store;

use crate::config::Config;
use crate::credentials::Credentials;
use crate::db;
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::splitter::create_chunker;

/// Store, providers, and chunker shared by the CLI commands and the
/// HTTP handlers.
///
/// Disabled providers are `None`; operations that need them fail with a
/// message naming the config section to set.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub chunker: Chunker,
}

impl Services {
    /// Open the SQLite store and construct the configured providers.
    pub async fn from_config(config: &Config, creds: &Credentials) -> Result<Self> {
        let store = Arc::new(db::open_store(config).await?);
        let (embedder, generator, chunker) = providers(config, creds)?;
        Ok(Self {
            store,
            embedder,
            generator,
            chunker,
        })
    }

    pub fn embedder(&self) -> Result<&dyn Embedder> {
        self.embedder
            .as_deref()
            .ok_or_else(|| anyhow!("Embedding provider is disabled; set [embedding].provider"))
    }

    pub fn generator(&self) -> Result<&dyn TextGenerator> {
        self.generator
            .as_deref()
            .ok_or_else(|| anyhow!("Generation provider is disabled; set [generation].provider"))
    }
}

type Providers = (
    Option<Arc<dyn Embedder>>,
    Option<Arc<dyn TextGenerator>>,
    Chunker,
);

fn providers(config: &Config, creds: &Credentials) -> Result<Providers> {
    let embedder = if config.embedding.is_enabled() {
        Some(create_embedder(&config.embedding, creds)?)
    } else {
        None
    };
    let generator = if config.generation.is_enabled() {
        Some(create_generator(&config.generation, creds)?)
    } else {
        None
    };
    let chunker = create_chunker(&config.chunking, generator.clone())?;
    Ok((embedder, generator, chunker))
}

/// Just the chunker, for commands that never embed or write (`chunk`,
/// `ingest --dry-run`). A generator is only built for the `llm` splitter.
pub fn build_chunker(config: &Config, creds: &Credentials) -> Result<Chunker> {
    let generator = if config.chunking.sentence_splitter == "llm" {
        Some(create_generator(&config.generation, creds)?)
    } else {
        None
    };
    create_chunker(&config.chunking, generator)
}
