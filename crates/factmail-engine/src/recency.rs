use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use factmail_store::{SentFactLog, StoreError};

pub const DEFAULT_WINDOW_DAYS: u32 = 60;

/// Reads the facts sent within a trailing window so the generator can avoid them.
pub struct RecencyFilter {
    log: Arc<dyn SentFactLog>,
}

impl RecencyFilter {
    pub fn new(log: Arc<dyn SentFactLog>) -> Self {
        Self { log }
    }

    /// Fact texts sent in the last `window_days`, newest first.
    pub async fn load_recent(&self, window_days: u32) -> Result<Vec<String>, StoreError> {
        self.load_recent_at(Utc::now(), window_days).await
    }

    pub async fn load_recent_at(
        &self,
        now: DateTime<Utc>,
        window_days: u32,
    ) -> Result<Vec<String>, StoreError> {
        let cutoff = now - Duration::days(i64::from(window_days));
        let records = self.log.recent_since(cutoff).await?;
        tracing::debug!(%cutoff, count = records.len(), "loaded recent facts");
        Ok(records.into_iter().map(|r| r.fact).collect())
    }
}
