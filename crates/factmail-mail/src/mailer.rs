//! Mailer trait and SMTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Email, MailError};

/// What the transport accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    /// The `Message-ID` header value set on the outgoing message.
    pub message_id: String,
}

/// Async email sending trait.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: &Email) -> Result<DeliveryReceipt, MailError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    #[default]
    Starttls,
    Tls,
    /// Plaintext. Local relays and test servers only.
    None,
}

/// Configuration for [`SmtpMailer`].
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    pub tls: SmtpTls,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Default sender address.
    pub from_address: String,
    /// Display name shown with the sender address.
    pub from_name: Option<String>,
    /// Transport default applies when unset.
    pub timeout: Option<Duration>,
}

impl MailerConfig {
    /// Gmail submission on 587 with STARTTLS.
    pub fn gmail(username: impl Into<String>, app_password: SecretString) -> Self {
        let username = username.into();
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            tls: SmtpTls::Starttls,
            from_address: username.clone(),
            username: Some(username),
            password: Some(app_password),
            from_name: None,
            timeout: None,
        }
    }
}

/// SMTP-based mailer using lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: MailerConfig) -> Result<Self, MailError> {
        if config.host.trim().is_empty() {
            return Err(MailError::MissingConfig("smtp host".into()));
        }
        if config.from_address.trim().is_empty() {
            return Err(MailError::MissingConfig("sender address".into()));
        }

        let address: Address = config
            .from_address
            .trim()
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from_address.clone()))?;
        let from = Mailbox::new(config.from_name.clone(), address);

        let mut builder = match config.tls {
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
        };

        builder = builder.port(config.port);
        if config.timeout.is_some() {
            builder = builder.timeout(config.timeout);
        }

        match (config.username, config.password) {
            (Some(username), Some(password)) => {
                builder = builder.credentials(Credentials::new(
                    username,
                    password.expose_secret().to_string(),
                ));
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("SMTP username and password must both be set, sending unauthenticated");
            }
            (None, None) => {}
        }

        tracing::debug!(host = %config.host, port = config.port, tls = ?config.tls, "smtp transport configured");

        Ok(Self {
            transport: Arc::new(builder.build()),
            from,
        })
    }

    /// Build a lettre Message and the Message-ID it carries.
    fn build_message(&self, email: &Email) -> Result<(Message, String), MailError> {
        let from_mailbox = match &email.from {
            Some(f) => f
                .parse::<Mailbox>()
                .map_err(|_| MailError::InvalidAddress(f.clone()))?,
            None => self.from.clone(),
        };

        let message_id = format!("<{}@{}>", uuid::Uuid::now_v7(), from_mailbox.email.domain());

        let mut builder = Message::builder()
            .from(from_mailbox)
            .subject(&email.subject)
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_PLAIN);

        for to in &email.to {
            let mailbox: Mailbox = to
                .trim()
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.clone()))?;
            builder = builder.to(mailbox);
        }

        let message = builder
            .body(email.text.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        Ok((message, message_id))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<DeliveryReceipt, MailError> {
        let (message, message_id) = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        tracing::info!(
            recipients = email.to.len(),
            message_id = %message_id,
            code = %response.code(),
            "email accepted by SMTP server"
        );

        Ok(DeliveryReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailerConfig {
        MailerConfig {
            host: "127.0.0.1".into(),
            port: 1,
            tls: SmtpTls::None,
            username: None,
            password: None,
            from_address: "digest@example.com".into(),
            from_name: Some("Daily Wealth & Life Insights".into()),
            timeout: Some(Duration::from_secs(2)),
        }
    }

    fn email() -> Email {
        Email::builder()
            .to_many(["a@example.com", "b@example.com"])
            .subject("Your Daily Wealth & Life Insights")
            .text("1. [Health & Wellness]\nWalk more.\n")
            .build()
            .unwrap()
    }

    #[test]
    fn gmail_defaults() {
        let c = MailerConfig::gmail("me@gmail.com", SecretString::from("app-pass".to_string()));
        assert_eq!(c.host, "smtp.gmail.com");
        assert_eq!(c.port, 587);
        assert_eq!(c.tls, SmtpTls::Starttls);
        assert_eq!(c.from_address, "me@gmail.com");
    }

    #[test]
    fn missing_sender_rejected() {
        let mut c = config();
        c.from_address = " ".into();
        assert!(matches!(
            SmtpMailer::from_config(c),
            Err(MailError::MissingConfig(_))
        ));
    }

    #[test]
    fn invalid_sender_rejected() {
        let mut c = config();
        c.from_address = "not-an-address".into();
        assert!(matches!(
            SmtpMailer::from_config(c),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn message_has_all_recipients_and_message_id() {
        let mailer = SmtpMailer::from_config(config()).unwrap();
        let (message, message_id) = mailer.build_message(&email()).unwrap();

        assert!(message_id.starts_with('<'));
        assert!(message_id.ends_with("@example.com>"));

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert!(raw.contains(&message_id));
        assert!(raw.contains("Daily Wealth"));
        assert!(raw.contains("digest@example.com"));
        assert_eq!(message.envelope().to().len(), 2);
    }

    #[tokio::test]
    async fn message_ids_are_unique() {
        let mailer = SmtpMailer::from_config(config()).unwrap();
        let (_, a) = mailer.build_message(&email()).unwrap();
        let (_, b) = mailer.build_message(&email()).unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn invalid_recipient_rejected() {
        let mailer = SmtpMailer::from_config(config()).unwrap();
        let bad = Email::builder()
            .to("nope")
            .subject("s")
            .text("t")
            .build()
            .unwrap();
        assert!(matches!(
            mailer.build_message(&bad),
            Err(MailError::InvalidAddress(a)) if a == "nope"
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_smtp_error() {
        let mailer = SmtpMailer::from_config(config()).unwrap();
        let err = mailer.send(&email()).await.unwrap_err();
        assert!(matches!(err, MailError::Smtp(_)));
    }
}
