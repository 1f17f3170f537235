use axum::extract::{Query, State};
use axum::Json;

use crate::auth::extractor::CurrentUser;
use crate::error::AppError;
use crate::models::{AuditEvent, AuditFilter};
use crate::state::SharedState;

pub async fn list(
    current: CurrentUser,
    State(state): State<SharedState>,
    Query(filter): Query<AuditFilter>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    current.require("audit.view")?;
    let events = state.store.list_audit(&filter).await?;
    Ok(Json(events))
}
