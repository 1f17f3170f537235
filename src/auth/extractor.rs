use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::flow::{self, AuthFailure};
use crate::auth::permission::{self, Decision};
use crate::error::AppError;
use crate::models::UserWithRole;
use crate::state::SharedState;

/// The authenticated caller, with its role already resolved.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserWithRole);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.user.id
    }

    pub fn require(&self, permission: &str) -> Result<(), AppError> {
        match permission::check(&self.0, permission) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::info!(user = %self.0.user.username, %permission, "Permission denied");
                Err(AppError::Forbidden(reason))
            }
        }
    }
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        flow::authenticate(&state.tokens, state.store.as_ref(), flow::bearer_token(header))
            .await
            .map(CurrentUser)
            .map_err(AppError::from)
    }
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::Store(err) => AppError::from(err),
            other => {
                tracing::debug!(reason = %other, "Authentication rejected");
                AppError::Unauthorized(AppError::CREDENTIALS_MESSAGE.to_string())
            }
        }
    }
}
