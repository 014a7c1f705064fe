//! Read helpers shared by both store surfaces.

use rusqlite::Connection;

use crate::errors::{IdentityError, Result};
use crate::sqlite::repositories::{ApiTokenRepo, AuthTokenRepo};

pub(super) fn api_user(conn: &Connection, token: &str) -> Result<String> {
    ApiTokenRepo::account_for_token(conn, token)?.ok_or(IdentityError::UnknownApiToken)
}

pub(super) fn api_token(conn: &Connection, account_id: &str) -> Result<String> {
    ApiTokenRepo::latest_for_account(conn, account_id)?
        .map(|row| row.token)
        .ok_or_else(|| IdentityError::ApiTokenNotFound(account_id.to_string()))
}

pub(super) fn auth_token(conn: &Connection, account_id: &str, provider: &str) -> Result<String> {
    AuthTokenRepo::get(conn, account_id, provider)?
        .map(|row| row.token)
        .ok_or_else(|| IdentityError::AuthTokenNotFound {
            account_id: account_id.to_string(),
            provider: provider.to_string(),
        })
}
