//! Raw row structs for `rusqlite` row mapping.
//!
//! Timestamps stay in their stored `YYYY-MM-DD HH:MM:SS` text form. Secret
//! columns are redacted from `Debug` output.

use std::fmt;

/// A row of the `users` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRow {
    /// External account identifier.
    pub account_id: String,
    /// Creation time.
    pub created: String,
}

/// A row of the `events` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRow {
    /// Account the action concerns.
    pub account_id: String,
    /// Action tag, e.g. `TOKEN_REVOKE`.
    pub action: String,
    /// Time of the action.
    pub created: String,
}

/// A row of the `api_tokens` table.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiTokenRow {
    /// Owning account.
    pub account_id: String,
    /// Token value.
    pub token: String,
    /// Issue time.
    pub created: String,
}

impl fmt::Debug for ApiTokenRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTokenRow")
            .field("account_id", &self.account_id)
            .field("token", &"<redacted>")
            .field("created", &self.created)
            .finish()
    }
}

/// A row of the `auth_tokens` table.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthTokenRow {
    /// Owning account.
    pub account_id: String,
    /// Provider tag, e.g. `DISCORD`.
    pub provider: String,
    /// Provider-issued credential.
    pub token: String,
    /// Time the credential was stored.
    pub created: String,
}

impl fmt::Debug for AuthTokenRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokenRow")
            .field("account_id", &self.account_id)
            .field("provider", &self.provider)
            .field("token", &"<redacted>")
            .field("created", &self.created)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
