//! Event repository: append-only access to the `events` audit table.
//!
//! Rows are keyed on `(account_id, action, created)` with second-resolution
//! timestamps, so the same action for the same account twice within one
//! second collides. [`EventRepo::insert`] reports that as
//! [`IdentityError::DuplicateIdentity`]; deciding to tolerate it is up to the
//! caller.
//!
//! [`IdentityError::DuplicateIdentity`]: crate::errors::IdentityError::DuplicateIdentity

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;

/// Event repository. Stateless; every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Append an audit event.
    pub fn insert(conn: &Connection, account_id: &str, action: &str, created: &str) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO events (account_id, action, created) VALUES (?1, ?2, ?3)",
            params![account_id, action, created],
        )?;
        Ok(())
    }

    /// All events for an account, oldest first.
    pub fn list_for_account(conn: &Connection, account_id: &str) -> Result<Vec<EventRow>> {
        let mut stmt = conn.prepare(
            "SELECT account_id, action, created FROM events
             WHERE account_id = ?1 ORDER BY created, action",
        )?;
        let rows = stmt
            .query_map(params![account_id], |row| {
                Ok(EventRow {
                    account_id: row.get(0)?,
                    action: row.get(1)?,
                    created: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count events of one action for an account.
    pub fn count_action(conn: &Connection, account_id: &str, action: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE account_id = ?1 AND action = ?2",
            params![account_id, action],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
