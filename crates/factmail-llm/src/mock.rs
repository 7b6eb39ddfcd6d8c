use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use factmail_core::errors::CompletionError;
use factmail_core::provider::{Completion, CompletionContent, CompletionProvider, CompletionRequest};

/// Pre-programmed responses for deterministic testing without API calls.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// A completion whose first block is text.
    Text(String),
    /// A completion whose first block is some other kind (`tool_use`, ...).
    NonText(String),
    /// Fail the `complete()` call itself.
    Error(CompletionError),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Mock provider that returns pre-programmed responses in sequence and
/// records every prompt it receives.
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: a provider that answers once with `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![MockResponse::text(text)])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let idx = {
            let mut prompts = self.prompts.lock();
            prompts.push(request.prompt.clone());
            prompts.len() - 1
        };

        let next = self.responses.lock().pop_front();
        match next {
            Some(MockResponse::Text(text)) => Ok(Completion::text("mock-model", text)),
            Some(MockResponse::NonText(kind)) => Ok(Completion {
                model: "mock-model".into(),
                content: CompletionContent::NonText { kind },
                stop_reason: Some("tool_use".into()),
                input_tokens: None,
                output_tokens: None,
            }),
            Some(MockResponse::Error(e)) => Err(e),
            None => Err(CompletionError::InvalidRequest(format!(
                "MockProvider: no response configured for call {idx}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_in_order() {
        let provider = MockProvider::new(vec![
            MockResponse::text("first"),
            MockResponse::NonText("tool_use".into()),
            MockResponse::Error(CompletionError::ProviderOverloaded),
        ]);
        let req = CompletionRequest::new("p", 10);

        let first = provider.complete(&req).await.unwrap();
        assert_eq!(first.as_text(), Some("first"));

        let second = provider.complete(&req).await.unwrap();
        assert!(second.as_text().is_none());

        let third = provider.complete(&req).await.unwrap_err();
        assert!(matches!(third, CompletionError::ProviderOverloaded));

        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_returns_error() {
        let provider = MockProvider::new(vec![]);
        let err = provider
            .complete(&CompletionRequest::new("p", 10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no response configured for call 0"));
    }

    #[tokio::test]
    async fn records_prompts() {
        let provider = MockProvider::with_text("ok");
        let _ = provider
            .complete(&CompletionRequest::new("the prompt", 10))
            .await;
        assert_eq!(provider.prompts(), vec!["the prompt".to_string()]);
    }
}
