//! User repository: CRUD for the `users` table.
//!
//! A user is nothing more than an external account ID and the time it was
//! registered. Deleting a user does not touch tokens or events.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{IdentityError, Result};
use crate::sqlite::row_types::UserRow;

/// User repository. Stateless; every method takes `&Connection`.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user. Fails with [`IdentityError::DuplicateIdentity`] if the
    /// account already exists.
    pub fn insert(conn: &Connection, account_id: &str, created: &str) -> Result<UserRow> {
        let _ = conn
            .execute(
                "INSERT INTO users (account_id, created) VALUES (?1, ?2)",
                params![account_id, created],
            )
            .map_err(|e| match IdentityError::from(e) {
                IdentityError::DuplicateIdentity(_) => {
                    IdentityError::DuplicateIdentity(format!("account {account_id} already exists"))
                }
                other => other,
            })?;
        Ok(UserRow {
            account_id: account_id.to_string(),
            created: created.to_string(),
        })
    }

    /// Get a user by account ID.
    pub fn get(conn: &Connection, account_id: &str) -> Result<Option<UserRow>> {
        let row = conn
            .query_row(
                "SELECT account_id, created FROM users WHERE account_id = ?1",
                params![account_id],
                |row| {
                    Ok(UserRow {
                        account_id: row.get(0)?,
                        created: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Check if a user exists.
    pub fn exists(conn: &Connection, account_id: &str) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE account_id = ?1)",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete a user. Returns `true` if a row was deleted.
    pub fn delete(conn: &Connection, account_id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM users WHERE account_id = ?1", params![account_id])?;
        Ok(changed > 0)
    }

    /// Count users.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::schema::ensure_schema;
    use assert_matches::assert_matches;

    const NOW: &str = "2024-05-01 12:00:00";

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_get() {
        let conn = setup();
        let row = UserRepo::insert(&conn, "42", NOW).unwrap();
        assert_eq!(row.account_id, "42");
        assert_eq!(UserRepo::get(&conn, "42").unwrap(), Some(row));
    }

    #[test]
    fn get_missing() {
        let conn = setup();
        assert!(UserRepo::get(&conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_names_account() {
        let conn = setup();
        UserRepo::insert(&conn, "42", NOW).unwrap();
        let err = UserRepo::insert(&conn, "42", NOW).unwrap_err();
        assert_matches!(err, IdentityError::DuplicateIdentity(msg) if msg == "account 42 already exists");
        assert_eq!(UserRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn oversized_account_id_rejected() {
        let conn = setup();
        let err = UserRepo::insert(&conn, &"9".repeat(33), NOW).unwrap_err();
        assert_matches!(err, IdentityError::InvalidValue(_));
        assert_eq!(UserRepo::count(&conn).unwrap(), 0);
    }

    #[test]
    fn empty_account_id_rejected() {
        let conn = setup();
        assert_matches!(
            UserRepo::insert(&conn, "", NOW).unwrap_err(),
            IdentityError::InvalidValue(_)
        );
    }

    #[test]
    fn max_length_account_id_accepted() {
        let conn = setup();
        UserRepo::insert(&conn, &"9".repeat(32), NOW).unwrap();
        assert!(UserRepo::exists(&conn, &"9".repeat(32)).unwrap());
    }

    #[test]
    fn exists_and_delete() {
        let conn = setup();
        UserRepo::insert(&conn, "42", NOW).unwrap();
        assert!(UserRepo::exists(&conn, "42").unwrap());
        assert!(UserRepo::delete(&conn, "42").unwrap());
        assert!(!UserRepo::exists(&conn, "42").unwrap());
    }

    #[test]
    fn delete_missing_returns_false() {
        let conn = setup();
        assert!(!UserRepo::delete(&conn, "nobody").unwrap());
    }
}
