//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating [`KeywardSettings`](crate::KeywardSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not JSON, or a field has the wrong type.
    #[error("malformed settings in {}: {source}", path.display())]
    Json {
        /// File the bad JSON came from.
        path: PathBuf,
        /// Parser or deserializer error.
        #[source]
        source: serde_json::Error,
    },

    /// A field parsed but holds a value outside its allowed range.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Dotted camelCase path of the field, e.g. `storage.poolSize`.
        field: &'static str,
        /// What is wrong with the value.
        reason: String,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn read_error_names_the_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/keyward/settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/keyward/settings.json"));
        assert!(msg.contains("denied"));
        assert!(err.source().is_some());
    }

    #[test]
    fn json_error_keeps_parser_detail() {
        let source = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err = SettingsError::Json {
            path: PathBuf::from("settings.json"),
            source,
        };
        assert!(err.to_string().starts_with("malformed settings in settings.json"));
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue {
            field: "storage.poolSize",
            reason: "must be at least 1".into(),
        };
        assert_eq!(err.to_string(), "invalid storage.poolSize: must be at least 1");
    }
}
