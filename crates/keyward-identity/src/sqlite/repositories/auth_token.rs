//! Auth token repository: CRUD for the `auth_tokens` table.
//!
//! Holds one provider-issued credential per `(account_id, provider)`.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::AuthTokenRow;

/// Auth token repository. Stateless; every method takes `&Connection`.
pub struct AuthTokenRepo;

impl AuthTokenRepo {
    /// Store a credential. The `(account_id, provider)` slot must be empty.
    pub fn insert(
        conn: &Connection,
        account_id: &str,
        provider: &str,
        token: &str,
        created: &str,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO auth_tokens (account_id, provider, token, created)
             VALUES (?1, ?2, ?3, ?4)",
            params![account_id, provider, token, created],
        )?;
        Ok(())
    }

    /// Get the credential for one provider.
    pub fn get(conn: &Connection, account_id: &str, provider: &str) -> Result<Option<AuthTokenRow>> {
        let row = conn
            .query_row(
                "SELECT account_id, provider, token, created FROM auth_tokens
                 WHERE account_id = ?1 AND provider = ?2",
                params![account_id, provider],
                |row| {
                    Ok(AuthTokenRow {
                        account_id: row.get(0)?,
                        provider: row.get(1)?,
                        token: row.get(2)?,
                        created: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Delete the credential for one provider. Returns the number removed.
    pub fn delete(conn: &Connection, account_id: &str, provider: &str) -> Result<usize> {
        let changed = conn.execute(
            "DELETE FROM auth_tokens WHERE account_id = ?1 AND provider = ?2",
            params![account_id, provider],
        )?;
        Ok(changed)
    }

    /// Delete every credential of an account. Returns the number removed.
    pub fn delete_for_account(conn: &Connection, account_id: &str) -> Result<usize> {
        let changed = conn.execute(
            "DELETE FROM auth_tokens WHERE account_id = ?1",
            params![account_id],
        )?;
        Ok(changed)
    }

    /// Count credentials of an account across providers.
    pub fn count_for_account(conn: &Connection, account_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM auth_tokens WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IdentityError;
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
        AuthTokenRepo::insert(&conn, "42", "DISCORD", "oauth-1", NOW).unwrap();
        let row = AuthTokenRepo::get(&conn, "42", "DISCORD").unwrap().unwrap();
        assert_eq!(row.token, "oauth-1");
        assert!(AuthTokenRepo::get(&conn, "42", "GITHUB").unwrap().is_none());
    }

    #[test]
    fn one_slot_per_provider() {
        let conn = setup();
        AuthTokenRepo::insert(&conn, "42", "DISCORD", "oauth-1", NOW).unwrap();
        let err = AuthTokenRepo::insert(&conn, "42", "DISCORD", "oauth-2", NOW).unwrap_err();
        assert_matches!(err, IdentityError::DuplicateIdentity(_));
    }

    #[test]
    fn delete_is_scoped_to_provider() {
        let conn = setup();
        AuthTokenRepo::insert(&conn, "42", "DISCORD", "d", NOW).unwrap();
        AuthTokenRepo::insert(&conn, "42", "GITHUB", "g", NOW).unwrap();

        assert_eq!(AuthTokenRepo::delete(&conn, "42", "DISCORD").unwrap(), 1);
        assert_eq!(AuthTokenRepo::delete(&conn, "42", "DISCORD").unwrap(), 0);
        assert_eq!(AuthTokenRepo::count_for_account(&conn, "42").unwrap(), 1);
    }

    #[test]
    fn delete_for_account_clears_all_providers() {
        let conn = setup();
        AuthTokenRepo::insert(&conn, "42", "DISCORD", "d", NOW).unwrap();
        AuthTokenRepo::insert(&conn, "42", "GITHUB", "g", NOW).unwrap();
        AuthTokenRepo::insert(&conn, "7", "DISCORD", "x", NOW).unwrap();

        assert_eq!(AuthTokenRepo::delete_for_account(&conn, "42").unwrap(), 2);
        assert_eq!(AuthTokenRepo::count_for_account(&conn, "7").unwrap(), 1);
    }

    #[test]
    fn long_provider_token_accepted_up_to_limit() {
        let conn = setup();
        AuthTokenRepo::insert(&conn, "42", "DISCORD", &"t".repeat(1024), NOW).unwrap();
        let err =
            AuthTokenRepo::insert(&conn, "43", "DISCORD", &"t".repeat(1025), NOW).unwrap_err();
        assert_matches!(err, IdentityError::InvalidValue(_));
    }
}
