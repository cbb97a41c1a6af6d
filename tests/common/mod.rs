//! Fake collaborators shared by the library-level tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

use docqa::config::Config;
use docqa::services::Services;
use docqa_core::chunk::Chunker;
use docqa_core::embedding::{Embedder, EmbeddingTask};
use docqa_core::generation::TextGenerator;

/// Keyword embedder: `[deploy, rollback, 1.0]` occurrence counts. The
/// constant third component keeps every text at least a little similar.
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keywords"
    }

    fn dims(&self) -> usize {
        3
    }

    async fn embed(&self, texts: &[String], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                vec![
                    t.matches("deploy").count() as f32,
                    t.matches("rollback").count() as f32,
                    1.0,
                ]
            })
            .collect())
    }
}

/// Records every prompt and answers with a fixed string.
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recorder"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Fridays.".to_string())
    }
}

pub fn test_config(root: &Path) -> Config {
    toml::from_str(&format!(
        "[db]\npath = \"{}/data/docqa.sqlite\"\n",
        root.display()
    ))
    .unwrap()
}

/// SQLite store under `root` with the fake providers.
pub async fn fake_services(root: &Path, generator: Arc<RecordingGenerator>) -> Services {
    let config = test_config(root);
    Services {
        store: Arc::new(docqa::db::open_store(&config).await.unwrap()),
        embedder: Some(Arc::new(KeywordEmbedder) as Arc<dyn Embedder>),
        generator: Some(generator as Arc<dyn TextGenerator>),
        chunker: Chunker::default(),
    }
}
