use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info_span, Instrument};

use factmail_core::{DispatchId, Fact, SentFactRecord};
use factmail_mail::{Email, Mailer};
use factmail_store::{RecipientDirectory, SentFactLog};

use crate::error::{DispatchError, GenerationError};
use crate::formatter::DigestFormatter;
use crate::generator::FactGenerator;
use crate::parse;
use crate::recency::{RecencyFilter, DEFAULT_WINDOW_DAYS};

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub subject: String,
    /// Trailing window of sent facts to avoid, in days.
    pub window_days: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            subject: "Your Daily Wealth & Life Insights".into(),
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent,
    NoRecipients,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub dispatch_id: DispatchId,
    pub outcome: DispatchOutcome,
    pub recipient_count: usize,
    pub message_id: Option<String>,
    pub facts: Vec<Fact>,
    /// False when the sent-fact log write failed after a successful send.
    pub facts_stored: bool,
    pub warnings: Vec<String>,
}

/// Result of a dry run: what a dispatch would send right now.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub dispatch_id: DispatchId,
    pub facts: Vec<Fact>,
    pub body: String,
    pub warnings: Vec<String>,
}

/// Runs one digest end to end. All collaborators are injected.
pub struct Dispatcher {
    directory: Arc<dyn RecipientDirectory>,
    log: Arc<dyn SentFactLog>,
    recency: RecencyFilter,
    generator: FactGenerator,
    formatter: DigestFormatter,
    mailer: Arc<dyn Mailer>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<dyn RecipientDirectory>,
        log: Arc<dyn SentFactLog>,
        generator: FactGenerator,
        mailer: Arc<dyn Mailer>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            directory,
            recency: RecencyFilter::new(log.clone()),
            log,
            generator,
            formatter: DigestFormatter::default(),
            mailer,
            config,
        }
    }

    pub fn with_formatter(mut self, formatter: DigestFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Load recipients, generate, send one email to all of them, then record
    /// what was sent.
    pub async fn run(&self) -> Result<DispatchSummary, DispatchError> {
        let dispatch_id = DispatchId::new();
        let span = info_span!("dispatch", dispatch_id = %dispatch_id);
        let result = self.run_inner(dispatch_id).instrument(span.clone()).await;

        if let Err(e) = &result {
            span.in_scope(|| tracing::error!(kind = e.kind(), error = %e, "dispatch failed"));
        }
        result
    }

    async fn run_inner(&self, dispatch_id: DispatchId) -> Result<DispatchSummary, DispatchError> {
        let recipients = self
            .directory
            .list_recipients()
            .await
            .map_err(DispatchError::Directory)?;

        if recipients.is_empty() {
            tracing::info!("no recipients, skipping generation");
            return Ok(DispatchSummary {
                dispatch_id,
                outcome: DispatchOutcome::NoRecipients,
                recipient_count: 0,
                message_id: None,
                facts: Vec::new(),
                facts_stored: false,
                warnings: Vec::new(),
            });
        }
        tracing::info!(recipients = recipients.len(), "recipients loaded");

        let mut warnings = Vec::new();
        let facts = self.generate_batch(&mut warnings).await?;
        let body = self.formatter.format(&facts);

        let email = Email::builder()
            .to_many(recipients.iter().cloned())
            .subject(self.config.subject.clone())
            .text(body)
            .build()?;
        let receipt = self.mailer.send(&email).await?;
        tracing::info!(message_id = %receipt.message_id, "digest sent");

        let facts_stored = self.record_sent(&facts, &mut warnings).await;

        Ok(DispatchSummary {
            dispatch_id,
            outcome: DispatchOutcome::Sent,
            recipient_count: recipients.len(),
            message_id: Some(receipt.message_id),
            facts,
            facts_stored,
            warnings,
        })
    }

    /// Generate and format a batch without sending or recording anything.
    pub async fn preview(&self) -> Result<Preview, GenerationError> {
        let dispatch_id = DispatchId::new();
        let span = info_span!("preview", dispatch_id = %dispatch_id);
        async move {
            let mut warnings = Vec::new();
            let facts = self.generate_batch(&mut warnings).await.inspect_err(|e| {
                tracing::error!(error = %e, "preview generation failed");
            })?;
            let body = self.formatter.format(&facts);
            Ok(Preview {
                dispatch_id,
                facts,
                body,
                warnings,
            })
        }
        .instrument(span)
        .await
    }

    /// Recency lookup, generation and coverage checks. Lookup failures and
    /// coverage problems land in `warnings`.
    async fn generate_batch(&self, warnings: &mut Vec<String>) -> Result<Vec<Fact>, GenerationError> {
        let avoid = match self.recency.load_recent(self.config.window_days).await {
            Ok(avoid) => avoid,
            Err(e) => {
                tracing::warn!(error = %e, "could not load recent facts, generating without avoid-list");
                warnings.push(format!("recent fact lookup failed: {e}"));
                Vec::new()
            }
        };

        let facts = self.generator.generate(&avoid).await?;

        for warning in parse::coverage_warnings(&facts) {
            tracing::warn!(%warning, "fact batch coverage");
            warnings.push(warning);
        }
        Ok(facts)
    }

    async fn record_sent(&self, facts: &[Fact], warnings: &mut Vec<String>) -> bool {
        let sent_at = Utc::now();
        let records: Vec<SentFactRecord> = facts
            .iter()
            .map(|f| SentFactRecord::from_fact(f, sent_at))
            .collect();

        match self.log.append(&records).await {
            Ok(stored) => {
                tracing::debug!(stored, "sent facts recorded");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to store sent facts");
                warnings.push(format!("failed to store sent facts: {e}"));
                false
            }
        }
    }
}
