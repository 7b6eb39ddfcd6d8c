//! Settings loading: compiled defaults, then the JSON file, then env vars.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{Result, SettingsError};
use crate::types::{FactmailSettings, StoreBackend};

/// Default location of the settings file (`~/.factmail/settings.json`).
pub fn settings_path() -> PathBuf {
    crate::factmail_home().join("settings.json")
}

/// Load settings from the default path with env overrides applied.
pub fn load_settings() -> Result<FactmailSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path`. A missing file is not an error; defaults apply.
pub fn load_settings_from_path(path: &Path) -> Result<FactmailSettings> {
    let file_value = if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;
        Some(serde_json::from_str::<Value>(&raw)?)
    } else {
        tracing::debug!(?path, "no settings file, using defaults");
        None
    };

    let mut settings = merge_over_defaults(file_value)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

fn merge_over_defaults(overlay: Option<Value>) -> Result<FactmailSettings> {
    let defaults = serde_json::to_value(FactmailSettings::default())?;
    let merged = match overlay {
        Some(file) => deep_merge(defaults, file),
        None => defaults,
    };
    Ok(serde_json::from_value(merged)?)
}

/// Recursively merge `overlay` into `base`. Objects merge key by key; any
/// other overlay value replaces the base value. `null` in the overlay keeps
/// the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => overlay_val,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut FactmailSettings) {
    apply_env_overrides_from(settings, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` as the environment.
///
/// The unprefixed names are the ones the hosted deployment already used
/// (`ANTHROPIC_API_KEY`, `GMAIL_USER`, `SUPABASE_URL`, ...).
pub fn apply_env_overrides_from<F>(settings: &mut FactmailSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("ANTHROPIC_API_KEY") {
        settings.anthropic.api_key = Some(key);
    }
    if let Some(model) = get("FACTMAIL_MODEL") {
        settings.anthropic.model = model;
    }

    if let Some(user) = get("SMTP_USER").or_else(|| get("GMAIL_USER")) {
        settings.mail.username = Some(user);
    }
    if let Some(pass) = get("SMTP_PASSWORD").or_else(|| get("GMAIL_APP_PASSWORD")) {
        settings.mail.password = Some(pass);
    }
    if let Some(host) = get("SMTP_HOST") {
        settings.mail.smtp_host = host;
    }
    if let Some(port) = get("SMTP_PORT") {
        match port.parse() {
            Ok(p) => settings.mail.smtp_port = p,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid SMTP_PORT"),
        }
    }

    if let Some(url) = get("SUPABASE_URL") {
        settings.store.postgrest_url = Some(url);
        settings.store.backend = StoreBackend::Postgrest;
    }
    if let Some(key) = get("SUPABASE_KEY") {
        settings.store.postgrest_key = Some(key);
    }
    if let Some(path) = get("FACTMAIL_DB_PATH") {
        settings.store.sqlite_path = PathBuf::from(path);
    }

    if let Some(port) = get("FACTMAIL_PORT") {
        match port.parse() {
            Ok(p) => settings.server.port = p,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid FACTMAIL_PORT"),
        }
    }
    if let Some(cron) = get("FACTMAIL_CRON") {
        settings.schedule.cron = Some(cron);
    }
    if let Some(level) = get("FACTMAIL_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn temp_settings(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("factmail-settings-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn deep_merge_nested_objects() {
        let base = serde_json::json!({"a": {"x": 1, "y": 2}, "b": 3});
        let overlay = serde_json::json!({"a": {"y": 20}, "c": 4});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged, serde_json::json!({"a": {"x": 1, "y": 20}, "b": 3, "c": 4}));
    }

    #[test]
    fn deep_merge_null_keeps_base() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("factmail-does-not-exist/settings.json");
        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.digest.window_days, 60);
    }

    #[test]
    fn file_overrides_defaults() {
        let path = temp_settings(r#"{"server": {"port": 8088}, "mail": {"subject": "Hi"}}"#);
        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.server.port, 8088);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.mail.subject, "Hi");
        assert_eq!(s.mail.smtp_port, 587);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_json_is_error() {
        let path = temp_settings("{not json");
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut s = merge_over_defaults(Some(serde_json::json!({"anthropic": {"model": "from-file"}})))
            .unwrap();
        apply_env_overrides_from(
            &mut s,
            env(&[
                ("FACTMAIL_MODEL", "from-env"),
                ("ANTHROPIC_API_KEY", "sk-test"),
                ("GMAIL_USER", "me@gmail.com"),
                ("GMAIL_APP_PASSWORD", "app-pass"),
            ]),
        );
        assert_eq!(s.anthropic.model, "from-env");
        assert_eq!(s.anthropic.api_key.as_deref(), Some("sk-test"));
        assert_eq!(s.mail.username.as_deref(), Some("me@gmail.com"));
        assert_eq!(s.mail.password.as_deref(), Some("app-pass"));
    }

    #[test]
    fn smtp_names_win_over_gmail_names() {
        let mut s = FactmailSettings::default();
        apply_env_overrides_from(
            &mut s,
            env(&[("GMAIL_USER", "gmail@x.com"), ("SMTP_USER", "smtp@x.com")]),
        );
        assert_eq!(s.mail.username.as_deref(), Some("smtp@x.com"));
    }

    #[test]
    fn supabase_url_selects_postgrest() {
        let mut s = FactmailSettings::default();
        apply_env_overrides_from(
            &mut s,
            env(&[("SUPABASE_URL", "https://abc.supabase.co"), ("SUPABASE_KEY", "anon")]),
        );
        assert_eq!(s.store.backend, StoreBackend::Postgrest);
        assert_eq!(s.store.postgrest_url.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(s.store.postgrest_key.as_deref(), Some("anon"));
    }

    #[test]
    fn invalid_port_is_ignored() {
        let mut s = FactmailSettings::default();
        apply_env_overrides_from(&mut s, env(&[("FACTMAIL_PORT", "http"), ("SMTP_PORT", "465")]));
        assert_eq!(s.server.port, 3000);
        assert_eq!(s.mail.smtp_port, 465);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut s = FactmailSettings::default();
        apply_env_overrides_from(&mut s, env(&[("ANTHROPIC_API_KEY", "  ")]));
        assert!(s.anthropic.api_key.is_none());
    }
}
