//! Auto-commit `IdentityStore` API.

use std::path::Path;
use std::sync::Arc;

use keyward_settings::{KeywardSettings, keyward_home};
use rusqlite::Connection;
use tracing::{info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::errors::Result;
use crate::sqlite::connection::{ConnectionConfig, ConnectionPool, new_file};
use crate::sqlite::repositories::{EventRepo, UserRepo};
use crate::sqlite::row_types::{EventRow, UserRow};
use crate::sqlite::schema::ensure_schema;
use crate::token::{DEFAULT_MAX_ATTEMPTS, RandomTokenSource, TokenSource};
use crate::types::EventAction;

use super::UnitOfWork;
use super::lookup;

/// Identity store over a pool of `SQLite` connections.
///
/// Every write method runs in its own [`UnitOfWork`] and commits before
/// returning. Use [`begin`](Self::begin) to group several operations into
/// one transaction.
///
/// The store is `Send + Sync`; each call checks out its own connection.
pub struct IdentityStore {
    pub(super) pool: ConnectionPool,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) tokens: Arc<dyn TokenSource>,
    pub(super) max_token_attempts: u32,
}

impl IdentityStore {
    /// Wrap an existing pool, creating the tables if missing.
    pub fn new(pool: ConnectionPool) -> Result<Self> {
        {
            let conn = pool.get()?;
            ensure_schema(conn.connection())?;
        }
        Ok(Self {
            pool,
            clock: Arc::new(SystemClock),
            tokens: Arc::new(RandomTokenSource::default()),
            max_token_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Open (or create) the database file at `path`.
    ///
    /// `settings` is validated first, since it may have been built in code
    /// rather than through the loader.
    pub fn open(path: &Path, settings: &KeywardSettings) -> Result<Self> {
        settings.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let pool = new_file(path, &ConnectionConfig::from(&settings.storage))?;
        let store = Self::new(pool)?
            .with_token_source(Arc::new(RandomTokenSource::new(settings.tokens.entropy_bytes)))
            .with_max_token_attempts(settings.tokens.max_generation_attempts);
        info!(path = %path.display(), "identity store opened");
        Ok(store)
    }

    /// Open the database configured in `settings`, relative paths resolved
    /// against `~/.keyward`.
    pub fn from_settings(settings: &KeywardSettings) -> Result<Self> {
        let path = settings.storage.resolve_database_path(&keyward_home());
        Self::open(&path, settings)
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the API token generator.
    #[must_use]
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Number of candidates tried before token generation gives up.
    #[must_use]
    pub fn with_max_token_attempts(mut self, attempts: u32) -> Self {
        self.max_token_attempts = attempts;
        self
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Start a unit of work.
    pub fn begin(&self) -> Result<UnitOfWork<'_>> {
        UnitOfWork::begin(self)
    }

    fn in_unit<T>(&self, f: impl FnOnce(&mut UnitOfWork<'_>) -> Result<T>) -> Result<T> {
        let mut unit = self.begin()?;
        let value = f(&mut unit)?;
        unit.commit()?;
        Ok(value)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.pool.get()?;
        let result = f(conn.connection());
        if let Some(err) = result.as_ref().err().filter(|e| e.is_statement_failure()) {
            warn!(error = %err, "read failed, discarding connection");
            conn.mark_broken();
        }
        result
    }

    // ── Writes ──────────────────────────────────────────────────────────

    /// See [`UnitOfWork::create_user`].
    pub fn create_user(&self, account_id: &str, generate_token: bool) -> Result<Option<String>> {
        self.in_unit(|unit| unit.create_user(account_id, generate_token))
    }

    /// See [`UnitOfWork::ensure_user`].
    pub fn ensure_user(&self, account_id: &str, generate_token: bool) -> Result<bool> {
        self.in_unit(|unit| unit.ensure_user(account_id, generate_token))
    }

    /// See [`UnitOfWork::delete_user`].
    pub fn delete_user(&self, account_id: &str) -> Result<bool> {
        self.in_unit(|unit| unit.delete_user(account_id))
    }

    /// See [`UnitOfWork::purge_user`].
    pub fn purge_user(&self, account_id: &str) -> Result<bool> {
        self.in_unit(|unit| unit.purge_user(account_id))
    }

    /// See [`UnitOfWork::create_token`].
    pub fn create_token(&self, account_id: &str) -> Result<String> {
        self.in_unit(|unit| unit.create_token(account_id))
    }

    /// See [`UnitOfWork::revoke_token`].
    pub fn revoke_token(&self, account_id: &str) -> Result<usize> {
        self.in_unit(|unit| unit.revoke_token(account_id))
    }

    /// See [`UnitOfWork::regenerate_token`]. Revocation and the new token
    /// commit together.
    pub fn regenerate_token(&self, account_id: &str) -> Result<String> {
        self.in_unit(|unit| unit.regenerate_token(account_id))
    }

    /// See [`UnitOfWork::register_event`].
    pub fn register_event(&self, account_id: &str, action: &EventAction) -> Result<bool> {
        self.in_unit(|unit| unit.register_event(account_id, action))
    }

    /// See [`UnitOfWork::set_auth_token`].
    pub fn set_auth_token(&self, account_id: &str, provider: &str, token: &str) -> Result<()> {
        self.in_unit(|unit| unit.set_auth_token(account_id, provider, token))
    }

    /// See [`UnitOfWork::set_auth_discord`].
    pub fn set_auth_discord(&self, account_id: &str, token: &str) -> Result<()> {
        self.in_unit(|unit| unit.set_auth_discord(account_id, token))
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Account holding `token`, or [`UnknownApiToken`](crate::IdentityError::UnknownApiToken).
    #[instrument(skip_all)]
    pub fn get_api_user(&self, token: &str) -> Result<String> {
        self.read(|conn| lookup::api_user(conn, token))
    }

    /// Most recently issued API token of the account.
    #[instrument(skip(self))]
    pub fn get_api_token(&self, account_id: &str) -> Result<String> {
        self.read(|conn| lookup::api_token(conn, account_id))
    }

    /// The account's stored credential for `provider`.
    #[instrument(skip(self))]
    pub fn get_auth_token(&self, account_id: &str, provider: &str) -> Result<String> {
        self.read(|conn| lookup::auth_token(conn, account_id, provider))
    }

    /// Whether the account exists.
    pub fn user_exists(&self, account_id: &str) -> Result<bool> {
        self.read(|conn| UserRepo::exists(conn, account_id))
    }

    /// Fetch the user row, if any.
    pub fn get_user(&self, account_id: &str) -> Result<Option<UserRow>> {
        self.read(|conn| UserRepo::get(conn, account_id))
    }

    /// Audit events of the account, oldest first.
    pub fn list_events(&self, account_id: &str) -> Result<Vec<EventRow>> {
        self.read(|conn| EventRepo::list_for_account(conn, account_id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
