//! # factmail-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`FactmailSettings::default()`]
//! 2. **Settings file**: `~/.factmail/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: highest priority, see [`apply_env_overrides_from`]
//!
//! The loaded value is handed to the binary, which builds every client from
//! it once at startup. There is no global settings instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_env_overrides_from, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::*;

use std::path::PathBuf;

/// Base directory for settings and local databases.
pub fn factmail_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".factmail")
}
