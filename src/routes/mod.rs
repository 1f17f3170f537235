pub mod audit;
pub mod auth;
pub mod roles;
pub mod users;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/logout", post(auth::logout))
        // Roles
        .route("/api/roles", get(roles::list).post(roles::create))
        .route("/api/roles/{id}", get(roles::get))
        // Users
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/{id}",
            get(users::get).put(users::update).delete(users::deactivate),
        )
        .route(
            "/api/users/{id}/reset-password",
            post(users::reset_password),
        )
        // Audit
        .route("/api/audit-logs", get(audit::list))
}
