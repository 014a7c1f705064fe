//! # keyward-identity
//!
//! Identity and credential store with a `SQLite` backend.
//!
//! - **Users**: external account IDs with a creation time
//! - **API tokens**: random bearer tokens issued per account, revocable and
//!   regenerable, with reverse lookup from token to account
//! - **Auth tokens**: one third-party credential per account and provider
//! - **Audit events**: an append-only trail of lifecycle actions, written
//!   best-effort so a duplicate never aborts the operation it describes
//! - **Units of work**: [`IdentityStore::begin`] groups operations into one
//!   transaction; a failed statement rolls back, reconnects, and leaves the
//!   unit usable

#![deny(unsafe_code)]

pub mod clock;
pub mod errors;
pub mod sqlite;
pub mod store;
pub mod token;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{IdentityError, Result};
pub use sqlite::row_types::{ApiTokenRow, AuthTokenRow, EventRow, UserRow};
pub use store::{IdentityStore, UnitOfWork};
pub use token::{RandomTokenSource, TokenSource};
pub use types::{DISCORD_PROVIDER, EventAction};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _clock = SystemClock;
        let _tokens = RandomTokenSource::default();
        assert_eq!(EventAction::authenticate("discord").to_string(), "AUTHENTICATE_DISCORD");
        assert_eq!(DISCORD_PROVIDER, "DISCORD");
    }
}
