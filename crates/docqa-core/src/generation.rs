//! Text generation trait and the question-answering prompt.

use anyhow::Result;
use async_trait::async_trait;

/// Answer returned when retrieval produced no usable context. The
/// generator is not called in that case.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I couldn't find enough relevant information to answer your question.";

/// A text-generation backend (chat model).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, e.g. `"gpt-4o-mini"`.
    fn model_name(&self) -> &str;

    /// Complete `prompt` and return the model's text, trimmed.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the grounded-answer prompt for `question` over `context`.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant. Answer only based on the context below.\n\
         Question: {question}\n\
         Context:\n\
         ---\n\
         {context}\n\
         ---\n\
         Answer:"
    )
}
