use async_trait::async_trait;

use crate::errors::CompletionError;

/// A single-turn text completion request.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// The first content block of a completion response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionContent {
    Text { text: String },
    /// Any non-text block (tool use, thinking, ...), identified by its type tag.
    NonText { kind: String },
}

#[derive(Clone, Debug)]
pub struct Completion {
    pub model: String,
    pub content: CompletionContent,
    pub stop_reason: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl Completion {
    /// Convenience for providers and tests that only produce text.
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            content: CompletionContent::Text { text: text.into() },
            stop_reason: Some("end_turn".into()),
            input_tokens: None,
            output_tokens: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            CompletionContent::Text { text } => Some(text),
            CompletionContent::NonText { .. } => None,
        }
    }
}

/// Trait implemented by each LLM backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    /// One blocking round-trip. No streaming, no retries.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError>;
}
