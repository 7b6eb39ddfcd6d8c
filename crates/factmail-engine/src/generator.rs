use std::sync::Arc;

use tracing::instrument;

use factmail_core::provider::{CompletionContent, CompletionProvider, CompletionRequest};
use factmail_core::Fact;

use crate::error::GenerationError;
use crate::parse;
use crate::prompt;

pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Asks the model for one batch of facts.
pub struct FactGenerator {
    provider: Arc<dyn CompletionProvider>,
    max_tokens: u32,
}

impl FactGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// One completion round-trip; `avoid` lists recently sent fact texts.
    #[instrument(skip_all, fields(provider = self.provider.name(), model = self.provider.model(), avoid = avoid.len()))]
    pub async fn generate(&self, avoid: &[String]) -> Result<Vec<Fact>, GenerationError> {
        let request = CompletionRequest::new(prompt::build_prompt(avoid), self.max_tokens);
        let completion = self.provider.complete(&request).await?;

        let text = match &completion.content {
            CompletionContent::Text { text } => text,
            CompletionContent::NonText { kind } => {
                return Err(GenerationError::UnexpectedContent(kind.clone()));
            }
        };

        let facts = parse::parse_facts(text)?;
        tracing::info!(
            count = facts.len(),
            output_tokens = completion.output_tokens,
            "facts generated"
        );
        Ok(facts)
    }
}
