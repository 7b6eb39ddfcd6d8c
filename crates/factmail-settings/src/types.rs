//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may contain any subset of fields; missing ones take the defaults below.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 8080 },
///   "digest": { "windowDays": 30 },
///   "schedule": { "cron": "0 0 13 * * *" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactmailSettings {
    pub server: ServerSettings,
    pub anthropic: AnthropicSettings,
    pub store: StoreSettings,
    pub mail: MailSettings,
    pub digest: DigestSettings,
    pub schedule: ScheduleSettings,
    pub logging: LoggingSettings,
}

impl FactmailSettings {
    /// Correct out-of-range values with a warning rather than rejecting them.
    pub fn validate(&mut self) {
        if self.digest.window_days == 0 {
            tracing::warn!("digest.windowDays must be at least 1, using 1");
            self.digest.window_days = 1;
        }
        if self.anthropic.max_tokens == 0 {
            let default = AnthropicSettings::default().max_tokens;
            tracing::warn!("anthropic.maxTokens must be positive, using {default}");
            self.anthropic.max_tokens = default;
        }
        if let Some(cron) = &self.schedule.cron {
            if cron.trim().is_empty() {
                self.schedule.cron = None;
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnthropicSettings {
    /// Usually supplied through `ANTHROPIC_API_KEY` rather than the file.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 2000,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Postgrest,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub sqlite_path: PathBuf,
    /// Base URL of a PostgREST endpoint (a Supabase project URL works).
    pub postgrest_url: Option<String>,
    pub postgrest_key: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            sqlite_path: crate::factmail_home().join("database/factmail.db"),
            postgrest_url: None,
            postgrest_key: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    Starttls,
    Tls,
    None,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub tls: TlsMode,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address. Falls back to `username` when unset.
    pub from_address: Option<String>,
    pub from_name: String,
    pub subject: String,
    /// Transport default applies when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            tls: TlsMode::Starttls,
            username: None,
            password: None,
            from_address: None,
            from_name: "Daily Wealth & Life Insights".to_string(),
            subject: "Your Daily Wealth & Life Insights".to_string(),
            timeout_secs: None,
        }
    }
}

impl MailSettings {
    pub fn sender_address(&self) -> Option<&str> {
        self.from_address
            .as_deref()
            .or(self.username.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DigestSettings {
    /// Trailing window, in days, of sent facts the generator must avoid.
    pub window_days: u32,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self { window_days: 60 }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSettings {
    /// Cron expression evaluated in UTC. Five-field and six-field (with seconds) forms both work.
    /// `None` leaves triggering to an external scheduler hitting the HTTP endpoint.
    pub cron: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    pub persist_warnings: bool,
    pub log_db_path: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
            persist_warnings: false,
            log_db_path: crate::factmail_home().join("database/logs.db"),
        }
    }
}
