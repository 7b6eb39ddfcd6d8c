use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use factmail_engine::DispatchOutcome;

use crate::server::AppState;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Daily Wealth &amp; Life Insights</title>
</head>
<body>
  <h1>Daily Wealth &amp; Life Insights</h1>
  <p>Generates ten facts a day with an LLM and emails them to every subscriber.</p>
  <ul>
    <li><a href="/api/generate-facts">/api/generate-facts</a> - preview today's facts</li>
    <li><a href="/api/send-daily-email">/api/send-daily-email</a> - generate and send the digest</li>
    <li><a href="/api/cron-test">/api/cron-test</a> - scheduler liveness probe</li>
    <li><a href="/health">/health</a></li>
  </ul>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn cron_test() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Cron test endpoint working!",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Generate a batch without sending it.
pub async fn generate_facts(State(state): State<AppState>) -> Response {
    match state.dispatcher.preview().await {
        Ok(preview) => Json(json!({
            "success": true,
            "dispatchId": preview.dispatch_id,
            "count": preview.facts.len(),
            "facts": preview.facts,
            "warnings": preview.warnings,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "Failed to generate facts",
                "details": e.to_string(),
            })),
        )
            .into_response(),
    }
}

/// Run a full dispatch. Hit by the external cron service.
pub async fn send_daily_email(State(state): State<AppState>) -> Response {
    let summary = match state.dispatcher.run().await {
        Ok(summary) => summary,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to send daily email",
                    "kind": e.kind(),
                    "details": e.to_string(),
                })),
            )
                .into_response();
        }
    };

    let body = match summary.outcome {
        DispatchOutcome::NoRecipients => json!({
            "success": true,
            "message": "No email addresses found in database",
            "dispatchId": summary.dispatch_id,
            "recipientCount": 0,
        }),
        DispatchOutcome::Sent => json!({
            "success": true,
            "message": format!("Email sent to {} recipients", summary.recipient_count),
            "dispatchId": summary.dispatch_id,
            "recipientCount": summary.recipient_count,
            "messageId": summary.message_id,
            "factsStored": summary.facts_stored,
            "warnings": summary.warnings,
        }),
    };
    Json(body).into_response()
}
