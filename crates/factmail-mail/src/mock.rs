use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DeliveryReceipt, Email, Mailer, MailError};

/// In-memory [`Mailer`] that records what it was asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    failure: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails with `MailError::Smtp(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<DeliveryReceipt, MailError> {
        if let Some(message) = &self.failure {
            return Err(MailError::Smtp(message.clone()));
        }
        let mut sent = self.sent.lock();
        sent.push(email.clone());
        Ok(DeliveryReceipt {
            message_id: format!("<recorded-{}@localhost>", sent.len()),
        })
    }
}
