pub mod config;
pub mod error;
pub mod state;
pub mod auth;
pub mod db;
pub mod models;
pub mod middleware;
pub mod routes;
pub mod rate_limit;
pub mod seed;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::jwt::TokenService;
use crate::auth::password::PasswordHasher;
use crate::config::{Config, RECOMMENDED_SECRET_LEN};
use crate::db::CredentialStore;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, config: Config) -> Result<Self, String> {
        if config.token.secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                "QMS_JWT_SECRET is shorter than {RECOMMENDED_SECRET_LEN} characters"
            );
        }

        Ok(AppState {
            tokens: TokenService::new(&config.token),
            hasher: PasswordHasher::new(config.hash_cost)?,
            login_limiter: LoginRateLimiter::new(),
            store,
            config,
        })
    }
}

pub fn build_app(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                )),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin '{o}': {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health() -> &'static str {
    "ok"
}
