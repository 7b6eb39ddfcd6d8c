//! Remote backend speaking the PostgREST protocol (Supabase exposes one at
//! `{project}/rest/v1`). Uses the same `emails` and `sent_facts` tables as
//! the SQLite schema.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use factmail_core::{ApiKey, FactCategory, SentFactRecord};

use crate::error::StoreError;
use crate::row_helpers;
use crate::traits::{RecipientDirectory, SentFactLog};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct EmailRow {
    email: String,
}

#[derive(Deserialize)]
struct SentFactRow {
    fact: String,
    category: String,
    #[serde(default)]
    source: Option<String>,
    sent_at: String,
}

pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl PostgrestStore {
    pub fn new(base_url: impl Into<String>, api_key: ApiKey) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let key = self.api_key.expose();
        req.header("apikey", key)
            .header("Authorization", format!("Bearer {key}"))
    }

    async fn check(resp: Response) -> Result<Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Remote {
            status: Some(status.as_u16()),
            message: body,
        })
    }
}

#[async_trait]
impl RecipientDirectory for PostgrestStore {
    async fn list_recipients(&self) -> Result<Vec<String>, StoreError> {
        let req = self
            .client
            .get(self.table_url("emails"))
            .query(&[("select", "email")]);
        let resp = Self::check(self.authorized(req).send().await?).await?;
        let rows: Vec<EmailRow> = resp.json().await?;
        Ok(rows.into_iter().map(|r| r.email).collect())
    }
}

#[async_trait]
impl SentFactLog for PostgrestStore {
    async fn recent_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SentFactRecord>, StoreError> {
        let gte = format!("gte.{}", row_helpers::format_timestamp(&cutoff));
        let req = self.client.get(self.table_url("sent_facts")).query(&[
            ("select", "fact,category,source,sent_at"),
            ("sent_at", gte.as_str()),
            ("order", "sent_at.desc"),
        ]);
        let resp = Self::check(self.authorized(req).send().await?).await?;
        let rows: Vec<SentFactRow> = resp.json().await?;

        rows.into_iter()
            .map(|row| {
                Ok(SentFactRecord {
                    fact: row.fact,
                    category: FactCategory::from(row.category),
                    source: row.source,
                    sent_at: row_helpers::parse_timestamp(&row.sent_at, "sent_facts", "sent_at")?,
                })
            })
            .collect()
    }

    async fn append(&self, records: &[SentFactRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let body: Vec<_> = records
            .iter()
            .map(|r| {
                json!({
                    "fact": r.fact,
                    "category": r.category.label(),
                    "source": r.source,
                    "sent_at": row_helpers::format_timestamp(&r.sent_at),
                })
            })
            .collect();

        let req = self
            .client
            .post(self.table_url("sent_facts"))
            .header("Prefer", "return=minimal")
            .json(&body);
        Self::check(self.authorized(req).send().await?).await?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn store(server: &MockServer) -> PostgrestStore {
        PostgrestStore::new(server.uri(), ApiKey::new("anon-key")).unwrap()
    }

    #[tokio::test]
    async fn lists_recipients_with_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/emails"))
            .and(query_param("select", "email"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"email": "a@example.com"},
                {"email": "b@example.com"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let emails = store(&server).list_recipients().await.unwrap();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn recent_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/sent_facts"))
            .and(query_param("select", "fact,category,source,sent_at"))
            .and(query_param("sent_at", "gte.2026-04-02T13:00:00.000Z"))
            .and(query_param("order", "sent_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "fact": "newest",
                    "category": "Investing & Wealth",
                    "source": "Vanguard",
                    "sent_at": "2026-05-31T13:00:00.123+00:00"
                },
                {
                    "fact": "older",
                    "category": "Tax & LLC Strategy",
                    "source": null,
                    "sent_at": "2026-05-01T13:00:00+00:00"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let cutoff = Utc.with_ymd_and_hms(2026, 4, 2, 13, 0, 0).unwrap();
        let records = store(&server).recent_since(cutoff).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fact, "newest");
        assert_eq!(records[0].category, FactCategory::InvestingAndWealth);
        assert_eq!(records[1].source, None);
    }

    #[tokio::test]
    async fn append_posts_rows_with_minimal_return() {
        let server = MockServer::start().await;
        let sent_at = Utc.with_ymd_and_hms(2026, 6, 1, 13, 0, 0).unwrap();
        Mock::given(method("POST"))
            .and(path("/rest/v1/sent_facts"))
            .and(header("Prefer", "return=minimal"))
            .and(body_json(json!([{
                "fact": "f",
                "category": "Health & Wellness",
                "source": "CDC",
                "sent_at": "2026-06-01T13:00:00.000Z"
            }])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let record = SentFactRecord {
            fact: "f".into(),
            category: FactCategory::HealthAndWellness,
            source: Some("CDC".into()),
            sent_at,
        };
        let n = store(&server).append(&[record]).await.unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn non_2xx_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
            .mount(&server)
            .await;

        let err = store(&server).list_recipients().await.unwrap_err();
        match err {
            StoreError::Remote { status, message } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "JWT expired");
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_is_remote_error() {
        let store = PostgrestStore::new("http://127.0.0.1:1", ApiKey::new("k")).unwrap();
        let err = store.list_recipients().await.unwrap_err();
        assert!(matches!(err, StoreError::Remote { status: None, .. }));
    }

    #[tokio::test]
    async fn append_empty_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        assert_eq!(store(&server).append(&[]).await.unwrap(), 0);
    }
}
