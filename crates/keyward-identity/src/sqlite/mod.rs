//! `SQLite` backend for the identity store.
//!
//! # Architecture
//!
//! - **[`connection`]**: `r2d2` pool whose connections run the strict session
//!   directives on checkout and can be flagged broken so the pool discards
//!   them instead of handing them out again.
//! - **[`schema`]**: create-if-missing DDL for the four identity tables.
//! - **[`row_types`]**: raw row structs for `rusqlite` row mapping.
//! - **[`repositories`]**: stateless repository structs; each method takes
//!   `&Connection` and executes SQL. Transactions are the caller's concern.

pub mod connection;
pub mod repositories;
pub mod row_types;
pub mod schema;

pub use connection::{
    ConnectionConfig, ConnectionPool, PooledConnection, StoreConnection, StoreConnectionManager,
    new_file,
};
pub use schema::ensure_schema;
