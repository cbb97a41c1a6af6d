//! TOML configuration.
//!
//! Every section except `[db]` is optional and falls back to the defaults
//! below. See `config/docqa.example.toml` for a commented example.
//!
//! ```toml
//! [db]
//! path = "./data/docqa.sqlite"
//!
//! [chunking]
//! target_size = 500
//! overlap_size = 50
//! sentence_splitter = "unicode"
//!
//! [retrieval]
//! top_k = 3
//! max_context_chars = 6000
//! noise_threshold = 0.6
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [generation]
//! provider = "openai"
//! model = "gpt-4o-mini"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docqa_core::chunk::{DEFAULT_OVERLAP_SIZE, DEFAULT_TARGET_SIZE};
use docqa_core::context::DEFAULT_MAX_CONTEXT_CHARS;
use docqa_core::noise::DEFAULT_NOISE_THRESHOLD;
use docqa_core::pipeline::{AnswerOptions, DEFAULT_TOP_K};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_size")]
    pub target_size: usize,
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
    /// `"unicode"` (deterministic) or `"llm"` (model-assisted).
    #[serde(default = "default_sentence_splitter")]
    pub sentence_splitter: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            overlap_size: DEFAULT_OVERLAP_SIZE,
            sentence_splitter: default_sentence_splitter(),
        }
    }
}

fn default_target_size() -> usize {
    DEFAULT_TARGET_SIZE
}
fn default_overlap_size() -> usize {
    DEFAULT_OVERLAP_SIZE
}
fn default_sentence_splitter() -> String {
    "unicode".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
        }
    }
}

impl RetrievalConfig {
    /// Answer options from config, with optional per-request overrides.
    pub fn answer_options(&self, top_k: Option<usize>, source: Option<String>) -> AnswerOptions {
        AnswerOptions {
            top_k: top_k.unwrap_or(self.top_k),
            max_context_chars: self.max_context_chars,
            noise_threshold: self.noise_threshold,
            source_filter: source,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_max_context_chars() -> usize {
    DEFAULT_MAX_CONTEXT_CHARS
}
fn default_noise_threshold() -> f64 {
    DEFAULT_NOISE_THRESHOLD
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL override (Ollama host, OpenAI-compatible gateway, ...).
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_embedding_retries(),
            timeout_secs: default_embedding_timeout_secs(),
            url: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout_secs(),
            url: None,
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_generation_retries() -> u32 {
    1
}
fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        // Chunking
        if self.chunking.target_size == 0 {
            bail!("chunking.target_size must be > 0");
        }
        if self.chunking.overlap_size >= self.chunking.target_size {
            bail!(
                "chunking.overlap_size ({}) must be smaller than chunking.target_size ({})",
                self.chunking.overlap_size,
                self.chunking.target_size
            );
        }
        match self.chunking.sentence_splitter.as_str() {
            "unicode" => {}
            "llm" => {
                if !self.generation.is_enabled() {
                    bail!("chunking.sentence_splitter = \"llm\" requires a generation provider");
                }
            }
            other => bail!(
                "Unknown sentence splitter: '{}'. Must be unicode or llm.",
                other
            ),
        }

        // Retrieval
        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        if self.retrieval.max_context_chars <= 20 {
            bail!("retrieval.max_context_chars must be > 20");
        }
        if !(self.retrieval.noise_threshold > 0.0 && self.retrieval.noise_threshold <= 1.0) {
            bail!("retrieval.noise_threshold must be in (0.0, 1.0]");
        }

        // Embedding
        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "gemini" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, gemini, or local.",
                other
            ),
        }
        if self.embedding.is_enabled() && self.embedding.provider != "local" {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }

        // Generation
        match self.generation.provider.as_str() {
            "disabled" | "openai" | "ollama" | "gemini" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be disabled, openai, ollama, or gemini.",
                other
            ),
        }
        if self.generation.is_enabled() && self.generation.model.is_none() {
            bail!(
                "generation.model must be specified when provider is '{}'",
                self.generation.provider
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> Result<Config> {
        let content = format!("[db]\npath = \"/tmp/docqa.sqlite\"\n{}", extra);
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.chunking.target_size, 500);
        assert_eq!(cfg.chunking.overlap_size, 50);
        assert_eq!(cfg.chunking.sentence_splitter, "unicode");
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.retrieval.max_context_chars, 6000);
        assert!((cfg.retrieval.noise_threshold - 0.6).abs() < f64::EPSILON);
        assert!(!cfg.embedding.is_enabled());
        assert!(!cfg.generation.is_enabled());
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");
    }

    #[test]
    fn test_overlap_must_be_below_target() {
        let err = parse("[chunking]\ntarget_size = 100\noverlap_size = 100\n").unwrap_err();
        assert!(err.to_string().contains("overlap_size"));
    }

    #[test]
    fn test_zero_target_rejected() {
        let err = parse("[chunking]\ntarget_size = 0\noverlap_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("target_size must be > 0"));
    }

    #[test]
    fn test_llm_splitter_requires_generation() {
        let err = parse("[chunking]\nsentence_splitter = \"llm\"\n").unwrap_err();
        assert!(err.to_string().contains("requires a generation provider"));

        parse(
            "[chunking]\nsentence_splitter = \"llm\"\n\
             [generation]\nprovider = \"ollama\"\nmodel = \"llama3\"\n",
        )
        .unwrap();
    }

    #[test]
    fn test_unknown_providers_rejected() {
        let err = parse("[embedding]\nprovider = \"pinecone\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
        let err = parse("[generation]\nprovider = \"claude\"\nmodel = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown generation provider"));
    }

    #[test]
    fn test_enabled_embedding_needs_model_and_dims() {
        let err = parse("[embedding]\nprovider = \"gemini\"\nmodel = \"embedding-001\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
        let err = parse("[embedding]\nprovider = \"openai\"\ndims = 1536\n").unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
        parse("[embedding]\nprovider = \"local\"\n").unwrap();
    }

    #[test]
    fn test_retrieval_bounds() {
        assert!(parse("[retrieval]\ntop_k = 0\n").is_err());
        assert!(parse("[retrieval]\nmax_context_chars = 20\n").is_err());
        assert!(parse("[retrieval]\nnoise_threshold = 0.0\n").is_err());
        assert!(parse("[retrieval]\nnoise_threshold = 1.0\n").is_ok());
    }

    #[test]
    fn test_answer_options_overrides() {
        let cfg = parse("[retrieval]\ntop_k = 5\n").unwrap();
        let opts = cfg.retrieval.answer_options(None, None);
        assert_eq!(opts.top_k, 5);
        let opts = cfg
            .retrieval
            .answer_options(Some(2), Some("report.pdf".to_string()));
        assert_eq!(opts.top_k, 2);
        assert_eq!(opts.source_filter.as_deref(), Some("report.pdf"));
    }
}
