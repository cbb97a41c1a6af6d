//! Model-assisted sentence splitting and chunker construction.
//!
//! [`LlmSentenceSplitter`] asks the configured generation provider to
//! return the sentences of a passage as a JSON array of strings. Long
//! documents are sent in paragraph-aligned windows so each request stays
//! small. If a response holds no usable array, the split fails; it never
//! falls back silently to a different segmentation.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use docqa_core::chunk::Chunker;
use docqa_core::generation::TextGenerator;
use docqa_core::sentence::{SentenceSplitter, UnicodeSentenceSplitter};

use crate::config::ChunkingConfig;

/// Upper bound on characters per splitting request.
const WINDOW_CHARS: usize = 4000;

pub struct LlmSentenceSplitter {
    generator: Arc<dyn TextGenerator>,
}

impl LlmSentenceSplitter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl SentenceSplitter for LlmSentenceSplitter {
    fn name(&self) -> &str {
        "llm"
    }

    async fn split(&self, text: &str) -> Result<Vec<String>> {
        let mut sentences = Vec::new();
        for (i, window) in windows(text, WINDOW_CHARS).iter().enumerate() {
            let response = self.generator.generate(&split_prompt(window)).await?;
            let parsed = parse_sentence_array(&response)
                .map_err(|e| anyhow!("sentence split of window {} failed: {}", i, e))?;
            tracing::debug!(window = i, sentences = parsed.len(), "model split window");
            sentences.extend(parsed);
        }
        Ok(sentences)
    }
}

fn split_prompt(text: &str) -> String {
    format!(
        "Split the following text into sentences. Return only a JSON array of strings, \
         one string per sentence, in their original order and without rewording.\n\n\
         Text:\n{}",
        text
    )
}

/// Group paragraphs into windows of at most `max_chars` characters. A
/// single paragraph longer than that becomes its own window.
fn windows(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let len = para.chars().count();
        if current_len > 0 && current_len + len + 2 > max_chars {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(para);
        current_len += len;
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Pull a JSON array of sentence strings out of a model response.
///
/// Tolerates Markdown code fences and prose around the array. Every
/// element must be a string; blank ones are dropped.
pub fn parse_sentence_array(response: &str) -> Result<Vec<String>> {
    let body = strip_code_fence(response.trim());
    let start = body
        .find('[')
        .ok_or_else(|| anyhow!("no JSON array in model response"))?;
    let end = body
        .rfind(']')
        .filter(|&e| e > start)
        .ok_or_else(|| anyhow!("unterminated JSON array in model response"))?;

    let values: Vec<serde_json::Value> = serde_json::from_str(&body[start..=end])
        .map_err(|e| anyhow!("model response is not a JSON array: {}", e))?;

    let mut sentences = Vec::with_capacity(values.len());
    for v in values {
        match v {
            serde_json::Value::String(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    sentences.push(s.to_string());
                }
            }
            other => bail!("non-string element in sentence array: {}", other),
        }
    }
    Ok(sentences)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string (`json`) on the opening line.
    let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Build the chunker described by `[chunking]`.
///
/// `generator` is required when `sentence_splitter = "llm"`.
pub fn create_chunker(
    config: &ChunkingConfig,
    generator: Option<Arc<dyn TextGenerator>>,
) -> Result<Chunker> {
    let splitter: Arc<dyn SentenceSplitter> = match config.sentence_splitter.as_str() {
        "unicode" => Arc::new(UnicodeSentenceSplitter),
        "llm" => {
            let generator = generator.ok_or_else(|| {
                anyhow!("sentence_splitter = \"llm\" requires a generation provider")
            })?;
            Arc::new(LlmSentenceSplitter::new(generator))
        }
        other => bail!("Unknown sentence splitter: {}", other),
    };
    Ok(Chunker::new(splitter, config.target_size, config.overlap_size))
}
