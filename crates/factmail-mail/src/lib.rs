//! Outbound email over SMTP.
//!
//! [`SmtpMailer`] wraps a pooled lettre transport built once from
//! [`MailerConfig`]. The [`Mailer`] trait is the seam the dispatch engine
//! depends on; [`RecordingMailer`] stands in for it in tests.
//!
//! ```ignore
//! let mailer = SmtpMailer::from_config(config)?;
//! let email = Email::builder()
//!     .to_many(["a@example.com", "b@example.com"])
//!     .subject("Your Daily Wealth & Life Insights")
//!     .text(body)
//!     .build()?;
//! let receipt = mailer.send(&email).await?;
//! ```

mod mailer;
mod message;
mod mock;

pub use mailer::{DeliveryReceipt, Mailer, MailerConfig, SmtpMailer, SmtpTls};
pub use message::{Email, EmailBuilder};
pub use mock::RecordingMailer;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("missing required config: {0}")]
    MissingConfig(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}
