use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::extractor::CurrentUser;
use crate::auth::password;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{NewUser, UserChanges, UserFilter, UserWithRole};
use crate::routes::auth::MessageResponse;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub role_id: String,
}

#[derive(Deserialize)]
pub struct ResetPassword {
    pub new_password: String,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::BadRequest("Invalid email address".to_string())),
    }
}

/// Shared by self-registration and admin user creation.
pub(crate) async fn create_account(
    state: &SharedState,
    req: UserCreate,
) -> Result<UserWithRole, AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }
    validate_email(&req.email)?;
    password::validate_new_password(&req.password).map_err(AppError::BadRequest)?;

    let password_hash = state.hasher.hash(&req.password).map_err(AppError::Internal)?;

    let user = state
        .store
        .create_user(NewUser {
            id: None,
            email: req.email,
            username: req.username,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            department: req.department,
            role_id: req.role_id,
        })
        .await?;

    tracing::info!(username = %user.username, role_id = %user.role_id, "User created");

    state
        .store
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", user.id)))
}

pub async fn list(
    current: CurrentUser,
    State(state): State<SharedState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<UserWithRole>>, AppError> {
    current.require("user.view")?;
    let users = state.store.list_users(&filter).await?;
    Ok(Json(users))
}

pub async fn create(
    current: CurrentUser,
    State(state): State<SharedState>,
    Json(req): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserWithRole>), AppError> {
    current.require("user.manage")?;

    let user = create_account(&state, req).await?;

    audit::log_event(
        state.store.as_ref(),
        Some(current.id()),
        "user.created",
        "users",
        Some(user.user.id.as_str()),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get(
    current: CurrentUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<UserWithRole>, AppError> {
    current.require("user.view")?;
    let user = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

pub async fn update(
    current: CurrentUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(changes): Json<UserChanges>,
) -> Result<Json<UserWithRole>, AppError> {
    current.require("user.manage")?;

    if let Some(email) = &changes.email {
        validate_email(email)?;
    }

    let details = json!({
        "role_id": changes.role_id,
        "is_active": changes.is_active,
    });

    state
        .store
        .update_user(&id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    audit::log_event(
        state.store.as_ref(),
        Some(current.id()),
        "user.updated",
        "users",
        Some(id.as_str()),
        Some(details),
    )
    .await;

    let user = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// Logical delete: the row stays, `is_active` goes false.
pub async fn deactivate(
    current: CurrentUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    current.require("user.manage")?;

    if !state.store.set_active(&id, false).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit::log_event(
        state.store.as_ref(),
        Some(current.id()),
        "user.deactivated",
        "users",
        Some(id.as_str()),
        None,
    )
    .await;

    Ok(Json(MessageResponse {
        message: "User deactivated successfully".to_string(),
    }))
}

pub async fn reset_password(
    current: CurrentUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<ResetPassword>,
) -> Result<Json<MessageResponse>, AppError> {
    current.require("user.manage")?;
    password::validate_new_password(&req.new_password).map_err(AppError::BadRequest)?;

    let pw_hash = state
        .hasher
        .hash(&req.new_password)
        .map_err(AppError::Internal)?;
    if !state.store.update_password(&id, &pw_hash).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit::log_event(
        state.store.as_ref(),
        Some(current.id()),
        "user.password_reset",
        "users",
        Some(id.as_str()),
        None,
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}
