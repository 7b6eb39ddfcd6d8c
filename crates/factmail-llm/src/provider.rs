use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use factmail_core::errors::CompletionError;
use factmail_core::provider::{Completion, CompletionProvider, CompletionRequest};
use factmail_core::security::ApiKey;

use crate::converter;
use crate::models;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Non-streaming client for the Anthropic Messages API.
pub struct AnthropicProvider {
    client: Client,
    api_key: ApiKey,
    model: String,
    max_output: Option<u32>,
    base_url: String,
}

impl AnthropicProvider {
    /// Build a provider for `model_name`, or the default model when `None`.
    ///
    /// Names outside the known model table are passed through unchanged so
    /// newer models work without a release.
    pub fn new(api_key: ApiKey, model_name: Option<&str>) -> Result<Self, CompletionError> {
        let (model, max_output) = match model_name {
            None => {
                let info = models::default_model();
                (info.name.to_string(), Some(info.max_output))
            }
            Some(name) => match models::find_model(name) {
                Some(info) => (info.name.to_string(), Some(info.max_output)),
                None => {
                    tracing::warn!(model = name, "unknown model, passing name through");
                    (name.to_string(), None)
                }
            },
        };

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| CompletionError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            max_output,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn clamp_max_tokens(&self, requested: u32) -> u32 {
        match self.max_output {
            Some(limit) if requested > limit => {
                tracing::warn!(requested, limit, "max_tokens above model limit, clamping");
                limit
            }
            _ => requested,
        }
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, max_tokens = request.max_tokens))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let request = CompletionRequest {
            prompt: request.prompt.clone(),
            max_tokens: self.clamp_max_tokens(request.max_tokens),
        };
        let body = converter::build_request_body(&request, &self.model);

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::NetworkError(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let retry = retry_after(resp.headers());
            let text = resp.text().await.unwrap_or_default();
            let err = CompletionError::from_status(status.as_u16(), converter::error_message(&text))
                .with_retry_after(retry);
            tracing::warn!(status = status.as_u16(), kind = err.error_kind(), "completion request failed");
            return Err(err);
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let completion = converter::parse_response_body(&value)?;
        tracing::debug!(
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            stop_reason = completion.stop_reason.as_deref(),
            "completion received"
        );
        Ok(completion)
    }
}
