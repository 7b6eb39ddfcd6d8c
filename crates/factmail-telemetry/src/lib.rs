mod logging;

pub use logging::{LogQuery, LogRecord, SqliteLogLayer, SqliteLogSink};

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// JSON lines on stdout when true, human-readable otherwise.
    pub json: bool,
    /// Whether to persist warn+ logs to SQLite.
    pub log_to_sqlite: bool,
    /// Path to the log database.
    pub log_db_path: PathBuf,
}

impl TelemetryConfig {
    /// Build from the string level used in settings files. Unknown levels fall back to INFO.
    pub fn new(level: &str, json: bool, log_to_sqlite: bool, log_db_path: PathBuf) -> Self {
        Self {
            log_level: Level::from_str(level).unwrap_or(Level::INFO),
            json,
            log_to_sqlite,
            log_db_path,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            json: true,
            log_to_sqlite: false,
            log_db_path: PathBuf::from("logs.db"),
        }
    }
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()))
}

/// Initialize the telemetry subsystem. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) {
    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_filter(env_filter(config.log_level))
    });
    let text_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter(config.log_level))
    });

    // Optional SQLite log sink for warn+ logs
    let sqlite_layer = if config.log_to_sqlite {
        match SqliteLogSink::new(&config.log_db_path) {
            Ok(sink) => Some(SqliteLogLayer::new(Arc::new(sink))),
            Err(e) => {
                eprintln!("factmail-telemetry: failed to open log DB: {e}");
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(sqlite_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_level_strings() {
        let c = TelemetryConfig::new("debug", false, false, PathBuf::from("x.db"));
        assert_eq!(c.log_level, Level::DEBUG);
        assert!(!c.json);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let c = TelemetryConfig::new("chatty", true, true, PathBuf::from("x.db"));
        assert_eq!(c.log_level, Level::INFO);
        assert!(c.log_to_sqlite);
    }
}
