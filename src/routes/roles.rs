use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::auth::extractor::CurrentUser;
use crate::auth::permission;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{NewRole, Role};
use crate::state::SharedState;

pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Role>>, AppError> {
    let roles = state.store.list_roles().await?;
    Ok(Json(roles))
}

pub async fn create(
    current: CurrentUser,
    State(state): State<SharedState>,
    Json(req): Json<NewRole>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    current.require("role.manage")?;

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Role name is required".to_string()));
    }
    permission::validate_permissions(&req.permissions).map_err(AppError::BadRequest)?;

    let role = state.store.create_role(req).await?;

    audit::log_event(
        state.store.as_ref(),
        Some(current.id()),
        "role.created",
        "roles",
        Some(role.id.as_str()),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Role>, AppError> {
    let role = state
        .store
        .find_role(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Role not found".to_string()))?;
    Ok(Json(role))
}
