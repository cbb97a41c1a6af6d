//! Embedding providers.
//!
//! Concrete implementations of [`Embedder`]:
//! - **[`OpenAiEmbedder`]**: `POST /v1/embeddings`.
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed`.
//! - **[`GeminiEmbedder`]**: `batchEmbedContents`, with separate task types
//!   for stored passages and queries.
//! - **`LocalEmbedder`** (feature `local-embeddings-fastembed`): runs the
//!   model in-process via fastembed; no network after model download.
//!
//! Each HTTP provider has one `parse_*` function that normalizes its
//! response into `Vec<Vec<f32>>`, failing when a vector is missing, holds
//! non-numbers, or has the wrong dimensionality. Retries follow
//! [`crate::http`].
//!
//! Use [`create_embedder`] to build the provider named in the config.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use docqa_core::embedding::{Embedder, EmbeddingTask};

use crate::config::EmbeddingConfig;
use crate::credentials::Credentials;
use crate::http::{build_client, send_json_with_retry, ProviderError};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Build the embedder selected by `config.provider`.
///
/// # Errors
///
/// Fails for `"disabled"`, for unknown providers, and when a required API
/// key is missing.
pub fn create_embedder(config: &EmbeddingConfig, creds: &Credentials) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config, creds)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        "gemini" => Ok(Arc::new(GeminiEmbedder::new(config, creds)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(local::LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embedding provider requires building with --features local-embeddings-fastembed"
        ),
        "disabled" => bail!("Embedding provider is disabled; set [embedding].provider"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

fn required_model(config: &EmbeddingConfig) -> Result<(String, usize)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required for {} provider", config.provider))?;
    let dims = config
        .dims
        .ok_or_else(|| anyhow::anyhow!("embedding.dims required for {} provider", config.provider))?;
    Ok((model, dims))
}

fn base_url(config: &EmbeddingConfig, default: &str) -> String {
    config
        .url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

// ============ OpenAI ============

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, creds: &Credentials) -> Result<Self> {
        let (model, dims) = required_model(config)?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: base_url(config, OPENAI_BASE_URL),
            api_key: creds.openai()?.to_string(),
            model,
            dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({ "model": self.model, "input": texts });

        let json = send_json_with_retry("OpenAI", self.max_retries, || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;
        Ok(parse_openai_response(&json, texts.len(), self.dims)?)
    }
}

/// Normalize `{"data": [{"index": i, "embedding": [...]}, ...]}`.
///
/// Items are reordered by `index` when present.
pub fn parse_openai_response(
    json: &Value,
    expected: usize,
    dims: usize,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    const P: &str = "OpenAI";
    let data = json
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::invalid(P, "missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .unwrap_or(pos);
        let values = item
            .get("embedding")
            .ok_or_else(|| ProviderError::invalid(P, format!("item {} has no embedding", pos)))?;
        indexed.push((index, to_vector(P, values, dims)?));
    }
    indexed.sort_by_key(|(i, _)| *i);

    let vectors: Vec<Vec<f32>> = indexed.into_iter().map(|(_, v)| v).collect();
    check_count(P, &vectors, expected)?;
    Ok(vectors)
}

// ============ Ollama ============

pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = required_model(config)?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: base_url(config, OLLAMA_BASE_URL),
            model,
            dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({ "model": self.model, "input": texts });

        let json = send_json_with_retry("Ollama", self.max_retries, || {
            self.client.post(&url).json(&body)
        })
        .await
        .map_err(|e| match e {
            ProviderError::Http { .. } => anyhow::anyhow!(
                "{} (is Ollama running at {}?)",
                e,
                self.base_url
            ),
            other => other.into(),
        })?;
        Ok(parse_ollama_response(&json, texts.len(), self.dims)?)
    }
}

/// Normalize `{"embeddings": [[...], ...]}`.
pub fn parse_ollama_response(
    json: &Value,
    expected: usize,
    dims: usize,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    const P: &str = "Ollama";
    let embeddings = json
        .get("embeddings")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::invalid(P, "missing embeddings array"))?;

    let vectors = embeddings
        .iter()
        .map(|e| to_vector(P, e, dims))
        .collect::<Result<Vec<_>, _>>()?;
    check_count(P, &vectors, expected)?;
    Ok(vectors)
}

// ============ Gemini ============

pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    /// Without the `models/` prefix.
    model: String,
    dims: usize,
    max_retries: u32,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig, creds: &Credentials) -> Result<Self> {
        let (model, dims) = required_model(config)?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: base_url(config, GEMINI_BASE_URL),
            api_key: creds.gemini()?.to_string(),
            model: model.trim_start_matches("models/").to_string(),
            dims,
            max_retries: config.max_retries,
        })
    }
}

fn gemini_task_type(task: EmbeddingTask) -> &'static str {
    match task {
        EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingTask::Query => "RETRIEVAL_QUERY",
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/v1beta/models/{}:batchEmbedContents",
            self.base_url, self.model
        );
        let model_ref = format!("models/{}", self.model);
        let requests: Vec<Value> = texts
            .iter()
            .map(|t| {
                json!({
                    "model": model_ref,
                    "content": { "parts": [{ "text": t }] },
                    "taskType": gemini_task_type(task),
                })
            })
            .collect();
        let body = json!({ "requests": requests });

        let json = send_json_with_retry("Gemini", self.max_retries, || {
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
        })
        .await?;
        Ok(parse_gemini_response(&json, texts.len(), self.dims)?)
    }
}

/// Normalize `{"embeddings": [{"values": [...]}, ...]}`.
pub fn parse_gemini_response(
    json: &Value,
    expected: usize,
    dims: usize,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    const P: &str = "Gemini";
    let embeddings = json
        .get("embeddings")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::invalid(P, "missing embeddings array"))?;

    let vectors = embeddings
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let values = e
                .get("values")
                .ok_or_else(|| ProviderError::invalid(P, format!("embedding {} has no values", i)))?;
            to_vector(P, values, dims)
        })
        .collect::<Result<Vec<_>, _>>()?;
    check_count(P, &vectors, expected)?;
    Ok(vectors)
}

// ============ Shared normalization ============

fn to_vector(provider: &'static str, value: &Value, dims: usize) -> Result<Vec<f32>, ProviderError> {
    let arr = value
        .as_array()
        .ok_or_else(|| ProviderError::invalid(provider, "embedding is not an array"))?;
    let vec = arr
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| ProviderError::invalid(provider, "embedding contains non-numeric values"))?;
    if vec.len() != dims {
        return Err(ProviderError::invalid(
            provider,
            format!("expected {} dimensions, got {}", dims, vec.len()),
        ));
    }
    Ok(vec)
}

fn check_count(provider: &'static str, vectors: &[Vec<f32>], expected: usize) -> Result<(), ProviderError> {
    if vectors.len() != expected {
        return Err(ProviderError::invalid(
            provider,
            format!("expected {} embeddings, got {}", expected, vectors.len()),
        ));
    }
    Ok(())
}

// ============ Local (fastembed) ============

#[cfg(feature = "local-embeddings-fastembed")]
mod local {
    use super::*;
    use std::sync::Mutex;

    pub struct LocalEmbedder {
        model_name: String,
        dims: usize,
        batch_size: usize,
        model: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
    }

    impl LocalEmbedder {
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config
                .model
                .clone()
                .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
            // Fail on unknown names up front rather than on first embed.
            to_fastembed_model(&model_name)?;
            let dims = config.dims.unwrap_or(match model_name.as_str() {
                "bge-base-en-v1.5" | "nomic-embed-text-v1.5" | "multilingual-e5-base" => 768,
                "bge-large-en-v1.5" | "multilingual-e5-large" => 1024,
                _ => 384,
            });
            Ok(Self {
                model_name,
                dims,
                batch_size: config.batch_size,
                model: Arc::new(Mutex::new(None)),
            })
        }
    }

    fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
        match name {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
            "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
            "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
            "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
            other => bail!(
                "Unknown local embedding model: '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
                 nomic-embed-text-v1.5, multilingual-e5-small, multilingual-e5-base, \
                 multilingual-e5-large",
                other
            ),
        }
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dims(&self) -> usize {
            self.dims
        }

        async fn embed(&self, texts: &[String], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let model_slot = self.model.clone();
            let model_name = self.model_name.clone();
            let batch_size = self.batch_size;
            let texts = texts.to_vec();

            tokio::task::spawn_blocking(move || {
                let mut slot = model_slot
                    .lock()
                    .map_err(|_| anyhow::anyhow!("local embedding model lock poisoned"))?;
                if slot.is_none() {
                    let model = fastembed::TextEmbedding::try_new(
                        fastembed::InitOptions::new(to_fastembed_model(&model_name)?)
                            .with_show_download_progress(true),
                    )
                    .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))?;
                    *slot = Some(model);
                }
                let model = slot
                    .as_mut()
                    .ok_or_else(|| anyhow::anyhow!("local embedding model unavailable"))?;
                model
                    .embed(texts, Some(batch_size))
                    .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
            })
            .await?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_reorders_by_index() {
        let json = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] },
            ]
        });
        let v = parse_openai_response(&json, 2, 2).unwrap();
        assert_eq!(v, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_openai_missing_data() {
        let err = parse_openai_response(&json!({ "error": "nope" }), 1, 2).unwrap_err();
        assert!(err.to_string().contains("missing data array"));
    }

    #[test]
    fn test_parse_rejects_wrong_dims() {
        let json = json!({ "embeddings": [[0.1, 0.2, 0.3]] });
        let err = parse_ollama_response(&json, 1, 768).unwrap_err();
        assert!(err.to_string().contains("expected 768 dimensions, got 3"));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let json = json!({ "embeddings": [[0.1, "x"]] });
        let err = parse_ollama_response(&json, 1, 2).unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_parse_rejects_wrong_count() {
        let json = json!({ "embeddings": [[0.1, 0.2]] });
        let err = parse_ollama_response(&json, 2, 2).unwrap_err();
        assert!(err.to_string().contains("expected 2 embeddings, got 1"));
    }

    #[test]
    fn test_parse_gemini() {
        let json = json!({
            "embeddings": [ { "values": [0.5, 0.5] }, { "values": [0.1, 0.9] } ]
        });
        let v = parse_gemini_response(&json, 2, 2).unwrap();
        assert_eq!(v[1], vec![0.1, 0.9]);

        let err = parse_gemini_response(&json!({ "embeddings": [{}] }), 1, 2).unwrap_err();
        assert!(err.to_string().contains("has no values"));
    }

    #[test]
    fn test_gemini_task_types() {
        assert_eq!(gemini_task_type(EmbeddingTask::Document), "RETRIEVAL_DOCUMENT");
        assert_eq!(gemini_task_type(EmbeddingTask::Query), "RETRIEVAL_QUERY");
    }

    #[test]
    fn test_create_embedder_disabled_and_missing_key() {
        let creds = Credentials::default();
        let err = create_embedder(&EmbeddingConfig::default(), &creds)
            .err()
            .unwrap();
        assert!(err.to_string().contains("disabled"));

        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: Some("text-embedding-3-small".to_string()),
            dims: Some(1536),
            ..EmbeddingConfig::default()
        };
        let err = create_embedder(&config, &creds).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_gemini_model_prefix_stripped() {
        let config = EmbeddingConfig {
            provider: "gemini".to_string(),
            model: Some("models/embedding-001".to_string()),
            dims: Some(768),
            ..EmbeddingConfig::default()
        };
        let creds = Credentials {
            gemini_api_key: Some("k".to_string()),
            ..Credentials::default()
        };
        let embedder = GeminiEmbedder::new(&config, &creds).unwrap();
        assert_eq!(embedder.model_name(), "embedding-001");
        assert_eq!(embedder.dims(), 768);
    }
}
