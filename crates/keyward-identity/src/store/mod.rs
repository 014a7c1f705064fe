//! High-level identity store API.
//!
//! Two surfaces expose the same operations:
//!
//! - [`IdentityStore`] methods each run in their own transaction and commit
//!   before returning.
//! - [`UnitOfWork`] methods run inside one caller-held transaction. Nothing
//!   is visible to other connections until [`UnitOfWork::commit`]; dropping
//!   the unit rolls it back.
//!
//! Any statement failure inside a unit rolls back its transaction, discards
//! the connection, and opens a fresh connection and transaction before the
//! error is returned.

mod identity_store;
mod lookup;
mod unit_of_work;

pub use identity_store::IdentityStore;
pub use unit_of_work::UnitOfWork;
