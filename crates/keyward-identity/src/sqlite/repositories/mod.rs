//! Repository implementations for `SQLite` database operations.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`
//! parameter, so the same code runs on a bare connection or inside a unit of
//! work's open transaction.

pub mod api_token;
pub mod auth_token;
pub mod event;
pub mod user;

pub use api_token::ApiTokenRepo;
pub use auth_token::AuthTokenRepo;
pub use event::EventRepo;
pub use user::UserRepo;
