use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use factmail_engine::Dispatcher;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression \"{expr}\": {reason}")]
    Invalid { expr: String, reason: String },
    #[error("cron schedule \"{0}\" will never fire")]
    NeverFires(String),
}

/// A parsed cron expression for the daily digest.
///
/// Accepts the `cron` crate's 6/7-field form (`sec min hour dom month dow [year]`)
/// and the common 5-field form, which gets a leading `0` seconds field.
#[derive(Clone, Debug)]
pub struct DigestSchedule {
    expr: String,
    schedule: cron::Schedule,
}

impl DigestSchedule {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let trimmed = expr.trim();
        let normalized = if trimmed.split_whitespace().count() == 5 {
            format!("0 {trimmed}")
        } else {
            trimmed.to_string()
        };

        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| ScheduleError::Invalid {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;

        match schedule.upcoming(Utc).next() {
            Some(next) => tracing::debug!(expr = %normalized, %next, "digest schedule parsed"),
            None => {
                tracing::warn!(expr = %normalized, "cron schedule will never fire");
                return Err(ScheduleError::NeverFires(expr.to_string()));
            }
        }

        Ok(Self {
            expr: normalized,
            schedule,
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

/// Run `dispatcher` on every tick of `schedule` until `cancel` fires.
///
/// Each run is awaited before the next fire time is computed, so runs never
/// overlap. Failures are logged by the dispatcher and do not stop the loop.
pub fn spawn_scheduler(
    schedule: DigestSchedule,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(expr = schedule.expr(), "scheduler started");
        loop {
            let now = Utc::now();
            let Some(next) = schedule.next_after(now) else {
                tracing::warn!(expr = schedule.expr(), "no further fire times, scheduler exiting");
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(%next, "next scheduled dispatch");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            match dispatcher.run().await {
                Ok(summary) => tracing::info!(
                    dispatch_id = %summary.dispatch_id,
                    outcome = ?summary.outcome,
                    recipients = summary.recipient_count,
                    "scheduled dispatch finished"
                ),
                Err(e) => tracing::error!(kind = e.kind(), "scheduled dispatch failed"),
            }
        }
        tracing::info!("scheduler stopped");
    })
}
