use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::auth::extractor::CurrentUser;
use crate::auth::jwt::TokenSubject;
use crate::auth::password;
use crate::config::RegistrationMode;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::UserWithRole;
use crate::routes::users::{create_account, UserCreate};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn login_rejected() -> AppError {
    AppError::Unauthorized(AppError::LOGIN_MESSAGE.to_string())
}

pub async fn login(
    State(state): State<SharedState>,
    Form(req): Form<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if let Err(lockout) = state.login_limiter.check(&req.username) {
        tracing::warn!(
            username = %req.username,
            retry_in_minutes = lockout.minutes(),
            "Login refused: too many failed attempts"
        );
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    // Unknown usernames still pay for one verification.
    let verified = match state.store.find_by_username(&req.username).await? {
        Some(found) if state.hasher.verify(&req.password, &found.user.password_hash) => {
            if found.user.is_active {
                Ok(found)
            } else {
                Err("inactive account")
            }
        }
        Some(_) => Err("bad password"),
        None => {
            state.hasher.verify_decoy(&req.password);
            Err("unknown user")
        }
    };
    let found = match verified {
        Ok(found) => found,
        Err(reason) => {
            let remaining = state.login_limiter.record_failure(&req.username);
            tracing::info!(username = %req.username, remaining, "Login failed: {reason}");
            return Err(login_rejected());
        }
    };

    let access_token = state
        .tokens
        .issue(&TokenSubject {
            user_id: found.user.id.clone(),
            username: found.user.username.clone(),
            role_id: found.user.role_id.clone(),
        })
        .map_err(AppError::Internal)?;

    audit::log_event(
        state.store.as_ref(),
        Some(found.user.id.as_str()),
        "user.login",
        "users",
        Some(found.user.id.as_str()),
        None,
    )
    .await;

    tracing::info!(username = %found.user.username, "Login succeeded");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserWithRole>), AppError> {
    if state.config.registration == RegistrationMode::Closed {
        return Err(AppError::Forbidden(
            "Registration is disabled. Contact your system administrator.".to_string(),
        ));
    }

    let role = state.store.find_role(&req.role_id).await?;
    if role.is_some_and(|role| role.is_superadmin) {
        tracing::warn!(
            username = %req.username,
            role_id = %req.role_id,
            "Self-registration into admin role refused"
        );
        return Err(AppError::Forbidden(
            "Administrator roles cannot be self-assigned".to_string(),
        ));
    }

    let user = create_account(&state, req).await?;

    audit::log_event(
        state.store.as_ref(),
        Some(user.user.id.as_str()),
        "user.registered",
        "users",
        Some(user.user.id.as_str()),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(current: CurrentUser) -> Json<UserWithRole> {
    Json(current.0)
}

pub async fn change_password(
    State(state): State<SharedState>,
    current: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state
        .hasher
        .verify(&req.current_password, &current.0.user.password_hash)
    {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    password::validate_new_password(&req.new_password).map_err(AppError::BadRequest)?;

    let pw_hash = state
        .hasher
        .hash(&req.new_password)
        .map_err(AppError::Internal)?;
    if !state.store.update_password(current.id(), &pw_hash).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit::log_event(
        state.store.as_ref(),
        Some(current.id()),
        "user.password_changed",
        "users",
        Some(current.id()),
        None,
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// Tokens are not revoked server-side; the client discards its copy.
pub async fn logout(current: CurrentUser) -> Json<MessageResponse> {
    tracing::info!(username = %current.0.user.username, "Logout");
    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}
