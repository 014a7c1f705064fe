//! `SQLite` connection pool with strict session directives.
//!
//! Uses `r2d2` pooling over `r2d2_sqlite`. Every new connection runs
//! [`SessionCustomizer`], which forbids skipping `CHECK` constraints, turns
//! on WAL and sets the busy timeout. Connections are wrapped in
//! [`StoreConnection`] so a unit of work can flag one as broken after a failed
//! statement; the pool drops broken connections on return and opens a fresh
//! one on the next checkout.

use std::ops::Deref;
use std::path::Path;
use std::time::Duration;

use r2d2::{ManageConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::info;

use keyward_settings::SettingsError;

use crate::errors::Result;

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<StoreConnectionManager>;

/// Alias for a pooled connection.
pub type PooledConnection = r2d2::PooledConnection<StoreConnectionManager>;

/// Configuration for the connection pool.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 4).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 30000).
    pub busy_timeout_ms: u32,
    /// Pool checkout timeout (default: 5s).
    pub connection_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            busy_timeout_ms: 30_000,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&keyward_settings::StorageSettings> for ConnectionConfig {
    fn from(settings: &keyward_settings::StorageSettings) -> Self {
        Self {
            pool_size: settings.pool_size,
            busy_timeout_ms: settings.busy_timeout_ms,
            connection_timeout: Duration::from_millis(settings.connection_timeout_ms),
        }
    }
}

/// A `SQLite` connection that remembers whether it is still trustworthy.
#[derive(Debug)]
pub struct StoreConnection {
    conn: Connection,
    broken: bool,
}

impl StoreConnection {
    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flag the connection so the pool discards it instead of reusing it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Whether [`mark_broken`](Self::mark_broken) was called.
    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

impl Deref for StoreConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

/// `r2d2` manager producing [`StoreConnection`]s.
#[derive(Debug)]
pub struct StoreConnectionManager {
    inner: SqliteConnectionManager,
}

impl StoreConnectionManager {
    /// Manager for a database file.
    pub fn file(path: &Path) -> Self {
        Self {
            inner: SqliteConnectionManager::file(path),
        }
    }
}

impl ManageConnection for StoreConnectionManager {
    type Connection = StoreConnection;
    type Error = rusqlite::Error;

    fn connect(&self) -> std::result::Result<StoreConnection, rusqlite::Error> {
        let conn = self.inner.connect()?;
        Ok(StoreConnection {
            conn,
            broken: false,
        })
    }

    fn is_valid(&self, conn: &mut StoreConnection) -> std::result::Result<(), rusqlite::Error> {
        conn.conn.execute_batch("")
    }

    fn has_broken(&self, conn: &mut StoreConnection) -> bool {
        conn.broken
    }
}

/// Session directives applied to each new connection.
///
/// Together with the `STRICT` tables this makes the engine reject
/// out-of-range or mistyped values instead of storing them.
#[derive(Debug)]
struct SessionCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<StoreConnection, rusqlite::Error> for SessionCustomizer {
    fn on_acquire(&self, conn: &mut StoreConnection) -> std::result::Result<(), rusqlite::Error> {
        conn.conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA ignore_check_constraints = OFF;\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

/// Create a file-backed connection pool.
///
/// A zero pool size or checkout timeout is rejected here; r2d2 would panic
/// on either.
pub fn new_file(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    if config.pool_size == 0 {
        return Err(SettingsError::InvalidValue {
            field: "storage.poolSize",
            reason: "must be at least 1".into(),
        }
        .into());
    }
    if config.connection_timeout.is_zero() {
        return Err(SettingsError::InvalidValue {
            field: "storage.connectionTimeoutMs",
            reason: "must be at least 1".into(),
        }
        .into());
    }
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.connection_timeout)
        .connection_customizer(Box::new(SessionCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(StoreConnectionManager::file(path))?;
    info!(path = %path.display(), pool_size = config.pool_size, "identity database pool ready");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IdentityError;

    fn file_pool(config: &ConnectionConfig) -> (tempfile::TempDir, ConnectionPool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.db");
        let pool = new_file(&path, config).unwrap();
        (dir, pool)
    }

    fn pragma<T: rusqlite::types::FromSql>(conn: &Connection, name: &str) -> T {
        conn.query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn file_pool_applies_directives() {
        let (_dir, pool) = file_pool(&ConnectionConfig::default());
        let conn = pool.get().unwrap();
        assert_eq!(pragma::<String>(conn.connection(), "journal_mode"), "wal");
        assert_eq!(pragma::<i64>(conn.connection(), "ignore_check_constraints"), 0);
        assert_eq!(pragma::<i64>(conn.connection(), "busy_timeout"), 30_000);
    }

    #[test]
    fn zero_pool_size_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectionConfig {
            pool_size: 0,
            ..Default::default()
        };
        let err = new_file(&dir.path().join("identity.db"), &config).unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Settings(SettingsError::InvalidValue { field: "storage.poolSize", .. })
        ));
    }

    #[test]
    fn zero_connection_timeout_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectionConfig {
            connection_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(new_file(&dir.path().join("identity.db"), &config).is_err());
    }

    #[test]
    fn custom_config() {
        let config = ConnectionConfig {
            pool_size: 2,
            busy_timeout_ms: 100,
            connection_timeout: Duration::from_secs(1),
        };
        let (_dir, pool) = file_pool(&config);
        assert_eq!(pool.max_size(), 2);
    }

    #[test]
    fn config_from_storage_settings() {
        let settings = keyward_settings::StorageSettings {
            pool_size: 9,
            busy_timeout_ms: 1234,
            connection_timeout_ms: 2500,
            ..Default::default()
        };
        let config = ConnectionConfig::from(&settings);
        assert_eq!(config.pool_size, 9);
        assert_eq!(config.busy_timeout_ms, 1234);
        assert_eq!(config.connection_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn broken_connection_is_replaced() {
        let config = ConnectionConfig {
            pool_size: 1,
            ..Default::default()
        };
        let (_dir, pool) = file_pool(&config);
        {
            let conn = pool.get().unwrap();
            conn.execute_batch("CREATE TEMP TABLE marker (x INTEGER)").unwrap();
        }
        {
            // Same physical connection: the temp table is still there.
            let mut conn = pool.get().unwrap();
            conn.execute_batch("SELECT * FROM temp.marker").unwrap();
            conn.mark_broken();
        }
        let conn = pool.get().unwrap();
        assert!(!conn.is_broken());
        assert!(conn.execute_batch("SELECT * FROM temp.marker").is_err());
    }
}
