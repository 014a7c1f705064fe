//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`KeywardSettings::default()`]
//! 2. If `~/.keyward/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `KEYWARD_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::KeywardSettings;

/// Resolve the keyward data directory (`~/.keyward`).
pub fn keyward_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".keyward")
}

/// Resolve the path to the settings file (`~/.keyward/settings.json`).
pub fn settings_path() -> PathBuf {
    keyward_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<KeywardSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. Invalid JSON or values that
/// fail [`KeywardSettings::validate`] are errors.
pub fn load_settings_from_path(path: &Path) -> Result<KeywardSettings> {
    let json_err = |source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    };
    let defaults = serde_json::to_value(KeywardSettings::default()).map_err(json_err)?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(json_err)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: KeywardSettings = serde_json::from_value(merged).map_err(json_err)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
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

/// Apply `KEYWARD_*` environment variable overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut KeywardSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Out-of-range or unparsable values are ignored with a warning and the
/// file/default value is kept.
pub fn apply_overrides(settings: &mut KeywardSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read_string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let read_u32 = |name: &str, min: u32, max: u32| {
        let val = lookup(name)?;
        let parsed = parse_u32_range(&val, min, max);
        if parsed.is_none() {
            tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
        }
        parsed
    };

    // ── Storage ─────────────────────────────────────────────────────
    if let Some(v) = read_string("KEYWARD_DB_PATH") {
        settings.storage.database_path = v;
    }
    if let Some(v) = read_u32("KEYWARD_POOL_SIZE", 1, 64) {
        settings.storage.pool_size = v;
    }
    if let Some(v) = read_u32("KEYWARD_BUSY_TIMEOUT_MS", 0, 600_000) {
        settings.storage.busy_timeout_ms = v;
    }

    // ── Tokens ──────────────────────────────────────────────────────
    if let Some(v) = read_u32("KEYWARD_TOKEN_ATTEMPTS", 1, 10_000) {
        settings.tokens.max_generation_attempts = v;
    }
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
