//! Caller-held transaction over one pooled connection.

use rusqlite::Connection;
use tracing::{debug, instrument, warn};

use crate::clock::format_timestamp;
use crate::errors::{IdentityError, Result};
use crate::sqlite::connection::PooledConnection;
use crate::sqlite::repositories::{ApiTokenRepo, AuthTokenRepo, EventRepo, UserRepo};
use crate::sqlite::row_types::{EventRow, UserRow};
use crate::token::generate_unique_token;
use crate::types::{DISCORD_PROVIDER, EventAction};

use super::IdentityStore;
use super::lookup;

/// A batch of identity operations committed or rolled back together.
///
/// Obtained from [`IdentityStore::begin`]. Reads through the unit see its
/// own uncommitted writes. Dropping the unit without calling
/// [`commit`](Self::commit) rolls everything back.
///
/// If a statement fails, the transaction is rolled back, the connection is
/// discarded and a new transaction is opened before the error is returned.
/// The unit stays usable, but work done before the failure is gone.
pub struct UnitOfWork<'s> {
    store: &'s IdentityStore,
    conn: Option<PooledConnection>,
}

impl<'s> UnitOfWork<'s> {
    pub(super) fn begin(store: &'s IdentityStore) -> Result<Self> {
        let mut unit = Self { store, conn: None };
        unit.open()?;
        Ok(unit)
    }

    fn open(&mut self) -> Result<()> {
        let conn = self.store.pool.get()?;
        // IMMEDIATE takes the write lock up front so check-then-insert
        // sequences cannot interleave with another writer.
        conn.execute_batch("BEGIN IMMEDIATE")?;
        self.conn = Some(conn);
        Ok(())
    }

    fn now(&self) -> String {
        format_timestamp(self.store.clock.now())
    }

    /// Run `f` on the unit's connection, recovering on statement failure.
    fn run<T>(&mut self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        if self.conn.is_none() {
            self.open()?;
        }
        let result = match self.conn.as_deref() {
            Some(conn) => f(conn.connection()),
            None => Err(IdentityError::Internal("unit of work has no connection".into())),
        };
        if let Some(err) = result.as_ref().err().filter(|e| e.is_statement_failure()) {
            self.recover(err);
        }
        result
    }

    fn recover(&mut self, cause: &IdentityError) {
        warn!(error = %cause, "statement failed, rolling back and reconnecting");
        self.discard();
        if let Err(err) = self.open() {
            warn!(error = %err, "reconnect failed, retrying on next operation");
        }
    }

    /// Roll back whatever is open and drop the connection from the pool.
    fn discard(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        if !conn.is_autocommit() {
            if let Err(err) = conn.execute_batch("ROLLBACK") {
                debug!(error = %err, "rollback of failed transaction did not complete");
            }
        }
        conn.mark_broken();
    }

    /// Make every write in the unit durable.
    ///
    /// On failure nothing is committed and the connection is discarded.
    pub fn commit(mut self) -> Result<()> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(IdentityError::Internal(
                "unit of work lost its connection before commit".into(),
            ));
        };
        if let Err(err) = conn.execute_batch("COMMIT") {
            let err = IdentityError::from(err);
            warn!(error = %err, "commit failed, discarding connection");
            self.discard();
            return Err(err);
        }
        debug!("unit of work committed");
        Ok(())
    }

    /// Discard every write in the unit.
    pub fn rollback(mut self) -> Result<()> {
        if let Some(mut conn) = self.conn.take() {
            if let Err(err) = conn.execute_batch("ROLLBACK") {
                conn.mark_broken();
                return Err(err.into());
            }
        }
        debug!("unit of work rolled back");
        Ok(())
    }

    // ── Users ───────────────────────────────────────────────────────────

    /// Insert a user and record `USER_CREATE`.
    ///
    /// With `generate_token` an API token is issued as well and returned.
    #[instrument(skip(self))]
    pub fn create_user(&mut self, account_id: &str, generate_token: bool) -> Result<Option<String>> {
        let created = self.now();
        let _ = self.run(|conn| UserRepo::insert(conn, account_id, &created))?;
        let _ = self.register_event(account_id, &EventAction::UserCreate)?;
        let token = if generate_token {
            Some(self.regenerate_token(account_id)?)
        } else {
            None
        };
        debug!("user created");
        Ok(token)
    }

    /// Create the user unless it exists. Returns whether it was created.
    #[instrument(skip(self))]
    pub fn ensure_user(&mut self, account_id: &str, generate_token: bool) -> Result<bool> {
        if self.run(|conn| UserRepo::exists(conn, account_id))? {
            return Ok(false);
        }
        let _ = self.create_user(account_id, generate_token)?;
        Ok(true)
    }

    /// Delete the user row and record `USER_DELETE`.
    ///
    /// Tokens and auth tokens of the account are left in place; use
    /// [`purge_user`](Self::purge_user) to remove them too. Returns whether a
    /// row was deleted.
    #[instrument(skip(self))]
    pub fn delete_user(&mut self, account_id: &str) -> Result<bool> {
        let deleted = self.run(|conn| UserRepo::delete(conn, account_id))?;
        let _ = self.register_event(account_id, &EventAction::UserDelete)?;
        Ok(deleted)
    }

    /// Revoke API tokens, drop auth tokens, then delete the user.
    ///
    /// Audit events are kept.
    #[instrument(skip(self))]
    pub fn purge_user(&mut self, account_id: &str) -> Result<bool> {
        let revoked = self.revoke_token(account_id)?;
        let cleared = self.run(|conn| AuthTokenRepo::delete_for_account(conn, account_id))?;
        let deleted = self.delete_user(account_id)?;
        debug!(revoked, cleared, deleted, "user purged");
        Ok(deleted)
    }

    /// Whether the account exists.
    pub fn user_exists(&mut self, account_id: &str) -> Result<bool> {
        self.run(|conn| UserRepo::exists(conn, account_id))
    }

    /// Fetch the user row, if any.
    pub fn get_user(&mut self, account_id: &str) -> Result<Option<UserRow>> {
        self.run(|conn| UserRepo::get(conn, account_id))
    }

    // ── API tokens ──────────────────────────────────────────────────────

    /// Issue a new API token for the account and record `TOKEN_CREATE`.
    ///
    /// Existing tokens are not touched.
    #[instrument(skip(self))]
    pub fn create_token(&mut self, account_id: &str) -> Result<String> {
        let created = self.now();
        let store = self.store;
        let token = self.run(|conn| {
            let token = generate_unique_token(
                store.tokens.as_ref(),
                store.max_token_attempts,
                |candidate| ApiTokenRepo::token_exists(conn, candidate),
            )?;
            ApiTokenRepo::insert(conn, account_id, &token, &created)?;
            Ok(token)
        })?;
        let _ = self.register_event(account_id, &EventAction::TokenCreate)?;
        debug!("api token issued");
        Ok(token)
    }

    /// Delete every API token of the account and record `TOKEN_REVOKE`.
    ///
    /// Returns how many tokens were deleted; zero is not an error.
    #[instrument(skip(self))]
    pub fn revoke_token(&mut self, account_id: &str) -> Result<usize> {
        let revoked = self.run(|conn| ApiTokenRepo::delete_for_account(conn, account_id))?;
        let _ = self.register_event(account_id, &EventAction::TokenRevoke)?;
        debug!(revoked, "api tokens revoked");
        Ok(revoked)
    }

    /// Revoke then issue, leaving the account with exactly one token.
    #[instrument(skip(self))]
    pub fn regenerate_token(&mut self, account_id: &str) -> Result<String> {
        let _ = self.revoke_token(account_id)?;
        self.create_token(account_id)
    }

    /// Account holding `token`.
    pub fn get_api_user(&mut self, token: &str) -> Result<String> {
        self.run(|conn| lookup::api_user(conn, token))
    }

    /// Most recently issued API token of the account.
    pub fn get_api_token(&mut self, account_id: &str) -> Result<String> {
        self.run(|conn| lookup::api_token(conn, account_id))
    }

    // ── Audit events ────────────────────────────────────────────────────

    /// Append an audit event stamped with the current second.
    ///
    /// The insert runs under a savepoint. If an identical event already
    /// exists for this second it is skipped with a warning and `Ok(false)`
    /// is returned; the rest of the unit is unaffected.
    #[instrument(skip(self, action), fields(action = %action))]
    pub fn register_event(&mut self, account_id: &str, action: &EventAction) -> Result<bool> {
        let created = self.now();
        let tag = action.to_string();
        self.run(|conn| {
            conn.execute_batch("SAVEPOINT audit_event")?;
            match EventRepo::insert(conn, account_id, &tag, &created) {
                Ok(()) => {
                    conn.execute_batch("RELEASE audit_event")?;
                    Ok(true)
                }
                Err(IdentityError::DuplicateIdentity(_)) => {
                    conn.execute_batch("ROLLBACK TO audit_event; RELEASE audit_event")?;
                    warn!(created = %created, "audit event already recorded for this second, skipped");
                    Ok(false)
                }
                Err(err) => Err(err),
            }
        })
    }

    /// Audit events of the account, oldest first.
    pub fn list_events(&mut self, account_id: &str) -> Result<Vec<EventRow>> {
        self.run(|conn| EventRepo::list_for_account(conn, account_id))
    }

    // ── Provider auth tokens ────────────────────────────────────────────

    /// Store `token` as the account's credential for `provider`, replacing
    /// any previous one, and record `AUTHENTICATE_<PROVIDER>`.
    #[instrument(skip(self, token))]
    pub fn set_auth_token(&mut self, account_id: &str, provider: &str, token: &str) -> Result<()> {
        let created = self.now();
        let replaced = self.run(|conn| {
            let replaced = AuthTokenRepo::delete(conn, account_id, provider)?;
            AuthTokenRepo::insert(conn, account_id, provider, token, &created)?;
            Ok(replaced)
        })?;
        let _ = self.register_event(account_id, &EventAction::authenticate(provider))?;
        debug!(replaced, "auth token stored");
        Ok(())
    }

    /// [`set_auth_token`](Self::set_auth_token) for Discord.
    pub fn set_auth_discord(&mut self, account_id: &str, token: &str) -> Result<()> {
        self.set_auth_token(account_id, DISCORD_PROVIDER, token)
    }

    /// The account's stored credential for `provider`.
    pub fn get_auth_token(&mut self, account_id: &str, provider: &str) -> Result<String> {
        self.run(|conn| lookup::auth_token(conn, account_id, provider))
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        if !conn.is_autocommit() {
            debug!("unit of work dropped without commit, rolling back");
            if let Err(err) = conn.execute_batch("ROLLBACK") {
                warn!(error = %err, "rollback on drop failed, discarding connection");
                conn.mark_broken();
            }
        }
    }
}
