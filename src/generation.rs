//! Text-generation providers.
//!
//! Concrete implementations of [`TextGenerator`]:
//! - **[`OpenAiGenerator`]**: `POST /v1/chat/completions`.
//! - **[`OllamaGenerator`]**: `POST /api/chat` with streaming off.
//! - **[`GeminiGenerator`]**: `generateContent`.
//!
//! The prompt is sent as a single user message. Retries follow
//! [`crate::http`] with `[generation].max_retries`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use docqa_core::generation::TextGenerator;

use crate::config::GenerationConfig;
use crate::credentials::Credentials;
use crate::http::{build_client, send_json_with_retry, ProviderError};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Build the generator selected by `config.provider`.
pub fn create_generator(
    config: &GenerationConfig,
    creds: &Credentials,
) -> Result<Arc<dyn TextGenerator>> {
    let api_key = match config.provider.as_str() {
        "openai" => Some(creds.openai()?.to_string()),
        "gemini" => Some(creds.gemini()?.to_string()),
        "ollama" => None,
        "disabled" => bail!("Generation provider is disabled; set [generation].provider"),
        other => bail!("Unknown generation provider: {}", other),
    };
    let settings = ChatSettings::from_config(config, api_key)?;

    Ok(match config.provider.as_str() {
        "openai" => Arc::new(OpenAiGenerator(settings.with_default_url(OPENAI_BASE_URL))),
        "gemini" => Arc::new(GeminiGenerator(settings.with_default_url(GEMINI_BASE_URL))),
        _ => Arc::new(OllamaGenerator(settings.with_default_url(OLLAMA_BASE_URL))),
    })
}

/// Connection and sampling settings shared by every chat provider.
struct ChatSettings {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl ChatSettings {
    fn from_config(config: &GenerationConfig, api_key: Option<String>) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for {} provider", config.provider))?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config
                .url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string()),
            api_key,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    fn with_default_url(mut self, default: &str) -> Self {
        if self.base_url.is_none() {
            self.base_url = Some(default.to_string());
        }
        self
    }

    fn url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_default()
    }

    fn key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

// ============ OpenAI ============

pub struct OpenAiGenerator(ChatSettings);

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.0.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let s = &self.0;
        let url = format!("{}/v1/chat/completions", s.url());
        let body = json!({
            "model": s.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": s.temperature,
            "max_tokens": s.max_tokens,
        });
        let json = send_json_with_retry("OpenAI", s.max_retries, || {
            s.client.post(&url).bearer_auth(s.key()).json(&body)
        })
        .await?;
        Ok(parse_openai_chat(&json)?)
    }
}

/// Extract `choices[0].message.content`.
pub fn parse_openai_chat(json: &Value) -> Result<String, ProviderError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ProviderError::invalid("OpenAI", "missing choices[0].message.content"))
}

// ============ Ollama ============

pub struct OllamaGenerator(ChatSettings);

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.0.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let s = &self.0;
        let url = format!("{}/api/chat", s.url());
        let body = json!({
            "model": s.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "options": {
                "temperature": s.temperature,
                "num_predict": s.max_tokens,
            },
        });
        let json = send_json_with_retry("Ollama", s.max_retries, || s.client.post(&url).json(&body))
            .await?;
        Ok(parse_ollama_chat(&json)?)
    }
}

/// Extract `message.content`.
pub fn parse_ollama_chat(json: &Value) -> Result<String, ProviderError> {
    json["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ProviderError::invalid("Ollama", "missing message.content"))
}

// ============ Gemini ============

pub struct GeminiGenerator(ChatSettings);

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.0.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let s = &self.0;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            s.url(),
            s.model.trim_start_matches("models/")
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": s.temperature,
                "maxOutputTokens": s.max_tokens,
            },
        });
        let json = send_json_with_retry("Gemini", s.max_retries, || {
            s.client
                .post(&url)
                .query(&[("key", s.key())])
                .json(&body)
        })
        .await?;
        Ok(parse_gemini_generate(&json)?)
    }
}

/// Extract `candidates[0].content.parts[*].text`, concatenated.
pub fn parse_gemini_generate(json: &Value) -> Result<String, ProviderError> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| ProviderError::invalid("Gemini", "missing candidates[0].content.parts"))?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() {
        return Err(ProviderError::invalid(
            "Gemini",
            "missing candidates[0].content.parts[0].text",
        ));
    }
    Ok(text.trim().to_string())
}
