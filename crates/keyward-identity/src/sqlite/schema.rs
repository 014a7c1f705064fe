//! Fixed identity schema, created if missing.
//!
//! There is no version tracking: the four tables never change shape, so
//! opening a store just runs the `CREATE ... IF NOT EXISTS` script inside a
//! transaction.

use rusqlite::Connection;
use tracing::debug;

use crate::errors::{IdentityError, Result};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Tables owned by the identity store.
pub const TABLES: [&str; 4] = ["api_tokens", "auth_tokens", "events", "users"];

/// Create any missing identity tables and indexes.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| IdentityError::Schema {
            message: format!("failed to begin schema transaction: {e}"),
        })?;
    tx.execute_batch(SCHEMA_SQL)
        .map_err(|e| IdentityError::Schema {
            message: format!("failed to create identity tables: {e}"),
        })?;
    tx.commit().map_err(|e| IdentityError::Schema {
        message: format!("failed to commit schema: {e}"),
    })?;
    debug!("identity schema ensured");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
