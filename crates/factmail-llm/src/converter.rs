use serde_json::{json, Value};

use factmail_core::errors::CompletionError;
use factmail_core::provider::{Completion, CompletionContent, CompletionRequest};

/// Convert a completion request into the Anthropic Messages API body.
pub fn build_request_body(request: &CompletionRequest, model: &str) -> Value {
    json!({
        "model": model,
        "max_tokens": request.max_tokens,
        "messages": [
            {"role": "user", "content": request.prompt},
        ],
    })
}

/// Parse a non-streaming Messages API response. Only the first content block
/// is considered.
pub fn parse_response_body(body: &Value) -> Result<Completion, CompletionError> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| CompletionError::InvalidResponse("missing content array".into()))?;

    let first = blocks
        .first()
        .ok_or_else(|| CompletionError::InvalidResponse("empty content array".into()))?;

    let kind = first.get("type").and_then(Value::as_str).unwrap_or("unknown");
    let content = match (kind, first.get("text").and_then(Value::as_str)) {
        ("text", Some(text)) => CompletionContent::Text {
            text: text.to_string(),
        },
        ("text", None) => {
            return Err(CompletionError::InvalidResponse(
                "text block without text".into(),
            ))
        }
        (other, _) => CompletionContent::NonText {
            kind: other.to_string(),
        },
    };

    let usage = body.get("usage");
    let token_count = |field: &str| {
        usage
            .and_then(|u| u.get(field))
            .and_then(Value::as_u64)
            .map(|n| n as u32)
    };

    Ok(Completion {
        model: body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content,
        stop_reason: body
            .get("stop_reason")
            .and_then(Value::as_str)
            .map(String::from),
        input_tokens: token_count("input_tokens"),
        output_tokens: token_count("output_tokens"),
    })
}

/// Pull a human-readable message out of an API error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}
