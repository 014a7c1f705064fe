//! Audit action tags and provider names.

use std::fmt;

/// Provider tag for Discord OAuth tokens.
pub const DISCORD_PROVIDER: &str = "DISCORD";

/// The action recorded by an audit event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventAction {
    /// A user record was created.
    UserCreate,
    /// A user record was deleted.
    UserDelete,
    /// An API token was issued.
    TokenCreate,
    /// All API tokens of an account were revoked.
    TokenRevoke,
    /// A provider auth token was stored (`AUTHENTICATE_<PROVIDER>`).
    Authenticate(String),
    /// Any other caller-defined action tag.
    Custom(String),
}

impl EventAction {
    /// Authentication with the given provider; the tag is upper-cased.
    pub fn authenticate(provider: &str) -> Self {
        Self::Authenticate(provider.to_ascii_uppercase())
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserCreate => f.write_str("USER_CREATE"),
            Self::UserDelete => f.write_str("USER_DELETE"),
            Self::TokenCreate => f.write_str("TOKEN_CREATE"),
            Self::TokenRevoke => f.write_str("TOKEN_REVOKE"),
            Self::Authenticate(provider) => write!(f, "AUTHENTICATE_{provider}"),
            Self::Custom(tag) => f.write_str(tag),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
