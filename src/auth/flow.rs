//! Per-request authentication: bearer token → claims → stored user → active check.
//!
//! Nothing is kept between requests; every call rebuilds the caller from the
//! token and a fresh store read.

use crate::auth::jwt::{TokenError, TokenService};
use crate::db::{CredentialStore, StoreError};
use crate::models::UserWithRole;

#[derive(Debug)]
pub enum AuthFailure {
    MissingCredentials,
    InvalidOrExpiredToken(TokenError),
    UnknownUser,
    InactiveAccount,
    Store(StoreError),
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailure::MissingCredentials => write!(f, "missing credentials"),
            AuthFailure::InvalidOrExpiredToken(err) => write!(f, "invalid or expired token ({err})"),
            AuthFailure::UnknownUser => write!(f, "token subject not found"),
            AuthFailure::InactiveAccount => write!(f, "account inactive"),
            AuthFailure::Store(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl From<StoreError> for AuthFailure {
    fn from(err: StoreError) -> Self {
        AuthFailure::Store(err)
    }
}

/// Pull the token out of an `Authorization` header value. Only the `Bearer`
/// scheme is accepted.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

pub async fn authenticate(
    tokens: &TokenService,
    store: &dyn CredentialStore,
    bearer: Option<&str>,
) -> Result<UserWithRole, AuthFailure> {
    let token = bearer.ok_or(AuthFailure::MissingCredentials)?;

    let claims = tokens
        .verify(token)
        .map_err(AuthFailure::InvalidOrExpiredToken)?;

    let user = store
        .find_by_id(&claims.sub)
        .await?
        .ok_or(AuthFailure::UnknownUser)?;

    if !user.user.is_active {
        return Err(AuthFailure::InactiveAccount);
    }

    Ok(user)
}
