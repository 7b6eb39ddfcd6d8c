//! Collaborator seams consumed by the dispatch engine.
//!
//! Both the SQLite repositories and [`PostgrestStore`](crate::PostgrestStore)
//! implement these, so the engine never knows which backend it talks to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use factmail_core::SentFactRecord;

use crate::error::StoreError;

/// Source of digest recipients.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Every subscriber address. An empty list is a valid answer.
    async fn list_recipients(&self) -> Result<Vec<String>, StoreError>;
}

/// Append-only log of facts that have gone out.
#[async_trait]
pub trait SentFactLog: Send + Sync {
    /// Records with `sent_at >= cutoff`, newest first.
    async fn recent_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SentFactRecord>, StoreError>;

    /// Append records, returning how many were written.
    async fn append(&self, records: &[SentFactRecord]) -> Result<usize, StoreError>;
}
