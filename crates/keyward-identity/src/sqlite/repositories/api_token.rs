//! API token repository: CRUD for the `api_tokens` table.
//!
//! A token value is unique across all accounts (enforced by
//! `idx_api_tokens_token`). An account normally holds at most one token, but
//! nothing here enforces that; callers revoke before issuing.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{IdentityError, Result};
use crate::sqlite::row_types::ApiTokenRow;

/// API token repository. Stateless; every method takes `&Connection`.
pub struct ApiTokenRepo;

impl ApiTokenRepo {
    /// Store a token for an account.
    pub fn insert(conn: &Connection, account_id: &str, token: &str, created: &str) -> Result<()> {
        let _ = conn
            .execute(
                "INSERT INTO api_tokens (account_id, token, created) VALUES (?1, ?2, ?3)",
                params![account_id, token, created],
            )
            .map_err(|e| match IdentityError::from(e) {
                IdentityError::DuplicateIdentity(_) => IdentityError::DuplicateIdentity(format!(
                    "api token value already issued (account {account_id})"
                )),
                other => other,
            })?;
        Ok(())
    }

    /// Whether any account holds this token value.
    pub fn token_exists(conn: &Connection, token: &str) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM api_tokens WHERE token = ?1)",
            params![token],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Account holding this token value.
    pub fn account_for_token(conn: &Connection, token: &str) -> Result<Option<String>> {
        let account = conn
            .query_row(
                "SELECT account_id FROM api_tokens WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(account)
    }

    /// Most recently issued token of an account. Ties on `created` go to the
    /// later insert.
    pub fn latest_for_account(conn: &Connection, account_id: &str) -> Result<Option<ApiTokenRow>> {
        let row = conn
            .query_row(
                "SELECT account_id, token, created FROM api_tokens
                 WHERE account_id = ?1 ORDER BY created DESC, rowid DESC LIMIT 1",
                params![account_id],
                |row| {
                    Ok(ApiTokenRow {
                        account_id: row.get(0)?,
                        token: row.get(1)?,
                        created: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Delete every token of an account. Returns the number removed.
    pub fn delete_for_account(conn: &Connection, account_id: &str) -> Result<usize> {
        let changed = conn.execute(
            "DELETE FROM api_tokens WHERE account_id = ?1",
            params![account_id],
        )?;
        Ok(changed)
    }

    /// Count tokens held by an account.
    pub fn count_for_account(conn: &Connection, account_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM api_tokens WHERE account_id = ?1",
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
    fn insert_and_lookup_both_ways() {
        let conn = setup();
        ApiTokenRepo::insert(&conn, "42", "tok-a", NOW).unwrap();

        assert!(ApiTokenRepo::token_exists(&conn, "tok-a").unwrap());
        assert_eq!(
            ApiTokenRepo::account_for_token(&conn, "tok-a").unwrap().as_deref(),
            Some("42")
        );
        let row = ApiTokenRepo::latest_for_account(&conn, "42").unwrap().unwrap();
        assert_eq!(row.token, "tok-a");
    }

    #[test]
    fn lookups_miss() {
        let conn = setup();
        assert!(!ApiTokenRepo::token_exists(&conn, "nope").unwrap());
        assert!(ApiTokenRepo::account_for_token(&conn, "nope").unwrap().is_none());
        assert!(ApiTokenRepo::latest_for_account(&conn, "42").unwrap().is_none());
    }

    #[test]
    fn token_value_unique_across_accounts() {
        let conn = setup();
        ApiTokenRepo::insert(&conn, "1", "shared", NOW).unwrap();
        let err = ApiTokenRepo::insert(&conn, "2", "shared", NOW).unwrap_err();
        assert_matches!(err, IdentityError::DuplicateIdentity(msg) if !msg.contains("shared"));
    }

    #[test]
    fn latest_prefers_newest() {
        let conn = setup();
        ApiTokenRepo::insert(&conn, "42", "old", "2024-05-01 12:00:00").unwrap();
        ApiTokenRepo::insert(&conn, "42", "new", "2024-05-01 12:00:05").unwrap();
        let row = ApiTokenRepo::latest_for_account(&conn, "42").unwrap().unwrap();
        assert_eq!(row.token, "new");
        assert_eq!(ApiTokenRepo::count_for_account(&conn, "42").unwrap(), 2);
    }

    #[test]
    fn latest_breaks_same_second_ties_by_insert_order() {
        let conn = setup();
        ApiTokenRepo::insert(&conn, "42", "zzz", NOW).unwrap();
        ApiTokenRepo::insert(&conn, "42", "aaa", NOW).unwrap();
        let row = ApiTokenRepo::latest_for_account(&conn, "42").unwrap().unwrap();
        assert_eq!(row.token, "aaa");

        ApiTokenRepo::insert(&conn, "42", "mmm", NOW).unwrap();
        let row = ApiTokenRepo::latest_for_account(&conn, "42").unwrap().unwrap();
        assert_eq!(row.token, "mmm");
    }

    #[test]
    fn delete_for_account_leaves_others() {
        let conn = setup();
        ApiTokenRepo::insert(&conn, "1", "a", NOW).unwrap();
        ApiTokenRepo::insert(&conn, "1", "b", NOW).unwrap();
        ApiTokenRepo::insert(&conn, "2", "c", NOW).unwrap();

        assert_eq!(ApiTokenRepo::delete_for_account(&conn, "1").unwrap(), 2);
        assert_eq!(ApiTokenRepo::count_for_account(&conn, "1").unwrap(), 0);
        assert!(ApiTokenRepo::token_exists(&conn, "c").unwrap());
    }

    #[test]
    fn delete_with_no_tokens_is_zero() {
        let conn = setup();
        assert_eq!(ApiTokenRepo::delete_for_account(&conn, "42").unwrap(), 0);
    }

    #[test]
    fn oversized_token_rejected() {
        let conn = setup();
        let err = ApiTokenRepo::insert(&conn, "42", &"t".repeat(65), NOW).unwrap_err();
        assert_matches!(err, IdentityError::InvalidValue(_));
    }
}
