use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::field::{Field, Visit};
use tracing::span;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A persisted warn+ event.
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub id: i64,
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    pub fields: Option<String>,
    pub dispatch_id: Option<String>,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<5} {} {}: {}",
            self.timestamp,
            self.level,
            self.dispatch_id.as_deref().unwrap_or("-"),
            self.target,
            self.message
        )?;
        if let Some(fields) = &self.fields {
            write!(f, " {fields}")?;
        }
        Ok(())
    }
}

/// Filter for reading back persisted events.
#[derive(Clone, Debug)]
pub struct LogQuery {
    /// Only events emitted inside this dispatch.
    pub dispatch_id: Option<String>,
    /// Skip WARN and keep ERROR.
    pub errors_only: bool,
    pub limit: u32,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            dispatch_id: None,
            errors_only: false,
            limit: 50,
        }
    }
}

/// SQLite sink that persists warn+ logs.
pub struct SqliteLogSink {
    conn: Mutex<Connection>,
}

const LOG_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        level TEXT NOT NULL,
        target TEXT NOT NULL,
        message TEXT NOT NULL,
        fields TEXT,
        dispatch_id TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_logs_dispatch ON logs(dispatch_id);";

impl SqliteLogSink {
    pub fn new(db_path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Self::with_connection(conn)
    }

    /// In-memory sink, for tests that want to assert on emitted warnings.
    pub fn in_memory() -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(LOG_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn insert(&self, record: &LogInsert) {
        // A failed log write has nowhere better to go.
        let _ = self.conn.lock().execute(
            "INSERT INTO logs (timestamp, level, target, message, fields, dispatch_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                record.timestamp,
                record.level,
                record.target,
                record.message,
                record.fields,
                record.dispatch_id,
            ],
        );
    }

    /// Matching events, newest first.
    pub fn recent(&self, q: &LogQuery) -> Result<Vec<LogRecord>, rusqlite::Error> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, level, target, message, fields, dispatch_id FROM logs
             WHERE (?1 IS NULL OR dispatch_id = ?1)
               AND (?2 = 0 OR level = 'ERROR')
             ORDER BY id DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![q.dispatch_id, q.errors_only, q.limit],
            |row| {
                Ok(LogRecord {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    level: row.get(2)?,
                    target: row.get(3)?,
                    message: row.get(4)?,
                    fields: row.get(5)?,
                    dispatch_id: row.get(6)?,
                })
            },
        )?;
        rows.collect()
    }
}

struct LogInsert {
    timestamp: String,
    level: String,
    target: String,
    message: String,
    fields: Option<String>,
    dispatch_id: Option<String>,
}

/// tracing Layer that writes warn+ events to SQLite.
pub struct SqliteLogLayer {
    sink: Arc<SqliteLogSink>,
}

impl SqliteLogLayer {
    pub fn new(sink: Arc<SqliteLogSink>) -> Self {
        Self { sink }
    }
}

/// Visitor that extracts fields from a tracing event.
struct FieldVisitor {
    message: Option<String>,
    fields: serde_json::Map<String, serde_json::Value>,
    dispatch_id: Option<String>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: serde_json::Map::new(),
            dispatch_id: None,
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let val = format!("{value:?}");
        match field.name() {
            "message" => self.message = Some(val),
            "dispatch_id" => self.dispatch_id = Some(val.trim_matches('"').to_string()),
            name => {
                let _ = self
                    .fields
                    .insert(name.to_string(), serde_json::Value::String(val));
            }
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "dispatch_id" => self.dispatch_id = Some(value.to_string()),
            name => {
                let _ = self
                    .fields
                    .insert(name.to_string(), serde_json::Value::String(value.to_string()));
            }
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

impl<S> Layer<S> for SqliteLogLayer
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        // Only persist WARN and above
        let level = *event.metadata().level();
        if level > tracing::Level::WARN {
            return;
        }

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        // Inherit dispatch_id from the enclosing dispatch span
        if visitor.dispatch_id.is_none() {
            if let Some(scope) = ctx.event_scope(event) {
                for span in scope {
                    let extensions = span.extensions();
                    if let Some(fields) = extensions.get::<SpanFields>() {
                        visitor.dispatch_id.clone_from(&fields.dispatch_id);
                        break;
                    }
                }
            }
        }

        let fields_json = if visitor.fields.is_empty() {
            None
        } else {
            serde_json::to_string(&visitor.fields).ok()
        };

        let record = LogInsert {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level.to_string().to_uppercase(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: fields_json,
            dispatch_id: visitor.dispatch_id,
        };

        self.sink.insert(&record);
    }

    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::new();
        attrs.record(&mut visitor);

        if visitor.dispatch_id.is_some() {
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(SpanFields {
                    dispatch_id: visitor.dispatch_id,
                });
            }
        }
    }
}

/// Stored on spans to propagate dispatch_id to child events.
struct SpanFields {
    dispatch_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tracing_subscriber::layer::SubscriberExt;

    fn temp_db() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("factmail-test-logs-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("test-logs.db")
    }

    fn insert(sink: &SqliteLogSink, level: &str, message: &str, dispatch_id: Option<&str>) {
        sink.insert(&LogInsert {
            timestamp: "2026-02-14T12:00:00.000Z".into(),
            level: level.into(),
            target: "factmail_engine::dispatcher".into(),
            message: message.into(),
            fields: None,
            dispatch_id: dispatch_id.map(Into::into),
        });
    }

    #[test]
    fn file_sink_survives_reopen() {
        let path = temp_db();
        {
            let sink = SqliteLogSink::new(&path).unwrap();
            insert(&sink, "WARN", "persist failed", Some("disp_1"));
        }
        let reopened = SqliteLogSink::new(&path).unwrap();
        let rows = reopened.recent(&LogQuery::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "persist failed");
    }

    #[test]
    fn recent_filters_by_dispatch() {
        let sink = SqliteLogSink::in_memory().unwrap();
        insert(&sink, "WARN", "run A", Some("disp_aaa"));
        insert(&sink, "WARN", "run B", Some("disp_bbb"));
        insert(&sink, "WARN", "outside any run", None);

        let rows = sink
            .recent(&LogQuery {
                dispatch_id: Some("disp_aaa".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "run A");
    }

    #[test]
    fn recent_errors_only() {
        let sink = SqliteLogSink::in_memory().unwrap();
        insert(&sink, "WARN", "coverage short", Some("disp_1"));
        insert(&sink, "ERROR", "smtp refused", Some("disp_1"));

        let rows = sink
            .recent(&LogQuery {
                errors_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "smtp refused");
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let sink = SqliteLogSink::in_memory().unwrap();
        for i in 0..5 {
            insert(&sink, "WARN", &format!("msg {i}"), None);
        }

        let rows = sink
            .recent(&LogQuery {
                limit: 2,
                ..Default::default()
            })
            .unwrap();
        let messages: Vec<_> = rows.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["msg 4", "msg 3"]);
    }

    #[test]
    fn record_display_line() {
        let record = LogRecord {
            id: 1,
            timestamp: "2026-02-14T12:00:00.000Z".into(),
            level: "WARN".into(),
            target: "factmail_engine::dispatcher".into(),
            message: "sent facts not stored".into(),
            fields: Some(r#"{"error":"disk full"}"#.into()),
            dispatch_id: Some("disp_1".into()),
        };
        assert_eq!(
            record.to_string(),
            r#"2026-02-14T12:00:00.000Z WARN  disp_1 factmail_engine::dispatcher: sent facts not stored {"error":"disk full"}"#
        );

        let bare = LogRecord {
            fields: None,
            dispatch_id: None,
            ..record
        };
        assert!(bare.to_string().contains(" - factmail_engine::dispatcher: "));
    }

    #[test]
    fn layer_persists_warnings_with_span_dispatch_id() {
        let sink = Arc::new(SqliteLogSink::in_memory().unwrap());
        let subscriber = tracing_subscriber::registry().with(SqliteLogLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("dispatch", dispatch_id = "disp_xyz");
            let _enter = span.enter();
            tracing::info!("not persisted");
            tracing::warn!(attempt = 2_u64, "recent facts unavailable");
        });

        let rows = sink.recent(&LogQuery::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].level, "WARN");
        assert_eq!(rows[0].message, "recent facts unavailable");
        assert_eq!(rows[0].dispatch_id.as_deref(), Some("disp_xyz"));
        assert!(rows[0].fields.as_deref().unwrap_or_default().contains("attempt"));
    }
}
