//! Error types for the identity store.
//!
//! [`IdentityError`] separates caller mistakes (duplicates, missing rows,
//! rejected values) from transient storage failures so an API layer can map
//! them to distinct responses. Constraint violations raised by `SQLite` are
//! classified once, in the `From<rusqlite::Error>` conversion.

use rusqlite::ffi;
use thiserror::Error;

/// Errors that can occur during identity store operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// An insert violated a uniqueness constraint (account ID, token value).
    #[error("duplicate identity: {0}")]
    DuplicateIdentity(String),

    /// No account holds the presented API token.
    #[error("api token not recognised")]
    UnknownApiToken,

    /// The account has no API token.
    #[error("no api token for account: {0}")]
    ApiTokenNotFound(String),

    /// The account has no token stored for the provider.
    #[error("no {provider} auth token for account: {account_id}")]
    AuthTokenNotFound {
        /// Account that was looked up.
        account_id: String,
        /// Provider tag that was looked up.
        provider: String,
    },

    /// The strict schema rejected a value (length or emptiness checks).
    #[error("value rejected by schema: {0}")]
    InvalidValue(String),

    /// Every generated token collided with an existing one.
    #[error("failed to generate a unique api token after {attempts} attempts")]
    TokenGenerationExhausted {
        /// Number of candidates tried.
        attempts: u32,
    },

    /// Any other `SQLite` statement failure.
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Creating the schema failed.
    #[error("schema error: {message}")]
    Schema {
        /// Describes which step failed and why.
        message: String,
    },

    /// The settings passed to the store are out of range.
    #[error("invalid store settings: {0}")]
    Settings(#[from] keyward_settings::SettingsError),

    /// Creating the database directory failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (e.g. a unit of work used after its connection was lost).
    #[error("internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Whether this is one of the lookup-miss variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownApiToken | Self::ApiTokenNotFound(_) | Self::AuthTokenNotFound { .. }
        )
    }

    /// Whether retrying the whole operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Sqlite(_) | Self::Pool(_))
    }

    /// Whether the error came out of executing a statement, which leaves the
    /// surrounding transaction in an unknown state.
    pub(crate) fn is_statement_failure(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(_) | Self::DuplicateIdentity(_) | Self::InvalidValue(_)
        )
    }
}

impl From<rusqlite::Error> for IdentityError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, ref message) = err {
            let detail = message.clone().unwrap_or_else(|| code.to_string());
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    return Self::DuplicateIdentity(detail);
                }
                ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                    return Self::InvalidValue(detail);
                }
                _ => {}
            }
        }
        Self::Sqlite(err)
    }
}

/// Convenience type alias for identity store results.
pub type Result<T> = std::result::Result<T, IdentityError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
