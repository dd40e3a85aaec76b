//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`BrokerSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `STOMP_*` environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::BrokerSettings;

/// Resolve the default settings file (`~/.stomp/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".stomp").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<BrokerSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// [`BrokerSettings::validate`] is an error.
pub fn load_settings_from_path(path: &Path) -> Result<BrokerSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file(path: &Path) -> Result<BrokerSettings> {
    let defaults = serde_json::to_value(BrokerSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `STOMP_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut BrokerSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply `STOMP_*` overrides read through `lookup`.
///
/// Empty values are skipped. Values that fail to parse or fall outside
/// their range are logged and ignored.
pub fn apply_overrides<F>(settings: &mut BrokerSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("STOMP_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("STOMP_PORT") {
        match parse_u16_range(&v, 1, u16::MAX) {
            Some(port) => settings.server.port = port,
            None => warn!(key = "STOMP_PORT", value = %v, "invalid port env var, ignoring"),
        }
    }
    if let Some(v) = read("STOMP_MAX_CONNECTIONS") {
        match parse_usize_range(&v, 1, 1_000_000) {
            Some(n) => settings.server.max_connections = n,
            None => warn!(key = "STOMP_MAX_CONNECTIONS", value = %v, "invalid usize env var, ignoring"),
        }
    }
    if let Some(v) = read("STOMP_SEND_QUEUE_CAPACITY") {
        match parse_usize_range(&v, 1, 1_000_000) {
            Some(n) => settings.server.send_queue_capacity = n,
            None => warn!(key = "STOMP_SEND_QUEUE_CAPACITY", value = %v, "invalid usize env var, ignoring"),
        }
    }
    if let Some(v) = read("STOMP_MAX_FRAME_SIZE") {
        match parse_usize_range(&v, 0, usize::MAX) {
            Some(n) => settings.server.max_frame_size = n,
            None => warn!(key = "STOMP_MAX_FRAME_SIZE", value = %v, "invalid usize env var, ignoring"),
        }
    }
    if let Some(v) = read("STOMP_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("STOMP_USERS_DB") {
        settings.credentials.database_path = Some(v);
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
