//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. `#[serde(default)]` lets a settings
//! file name only the fields it wants to change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Largest entropy size whose base64url encoding still fits the 64-char
/// token column.
pub const MAX_TOKEN_ENTROPY_BYTES: usize = 48;

/// Root settings type.
///
/// ```json
/// {
///   "storage": { "databasePath": "/var/lib/keyward/identity.db" },
///   "tokens": { "maxGenerationAttempts": 99 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeywardSettings {
    /// Backing database and connection pool.
    pub storage: StorageSettings,
    /// API token generation.
    pub tokens: TokenSettings,
}

impl KeywardSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.tokens.validate()
    }
}

/// Database location and pool sizing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// `SQLite` database file. Relative paths resolve against `~/.keyward`.
    pub database_path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u32,
    /// How long to wait for a free pooled connection, in milliseconds.
    pub connection_timeout_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: "identity.db".to_string(),
            pool_size: 4,
            busy_timeout_ms: 30_000,
            connection_timeout_ms: 5_000,
        }
    }
}

impl StorageSettings {
    /// Resolve [`database_path`](Self::database_path) against `base`.
    pub fn resolve_database_path(&self, base: &Path) -> PathBuf {
        let path = Path::new(&self.database_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.database_path.trim().is_empty() {
            return Err(SettingsError::InvalidValue {
                field: "storage.databasePath",
                reason: "must not be empty".into(),
            });
        }
        if self.pool_size == 0 {
            return Err(SettingsError::InvalidValue {
                field: "storage.poolSize",
                reason: "must be at least 1".into(),
            });
        }
        if self.connection_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue {
                field: "storage.connectionTimeoutMs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// API token generation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenSettings {
    /// Random bytes drawn per token before base64url encoding.
    pub entropy_bytes: usize,
    /// Attempts to find an unused token value before giving up.
    pub max_generation_attempts: u32,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            entropy_bytes: MAX_TOKEN_ENTROPY_BYTES,
            max_generation_attempts: 99,
        }
    }
}

impl TokenSettings {
    fn validate(&self) -> Result<()> {
        if self.entropy_bytes == 0 || self.entropy_bytes > MAX_TOKEN_ENTROPY_BYTES {
            return Err(SettingsError::InvalidValue {
                field: "tokens.entropyBytes",
                reason: format!(
                    "must be between 1 and {MAX_TOKEN_ENTROPY_BYTES}, got {}",
                    self.entropy_bytes
                ),
            });
        }
        if self.max_generation_attempts == 0 {
            return Err(SettingsError::InvalidValue {
                field: "tokens.maxGenerationAttempts",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
