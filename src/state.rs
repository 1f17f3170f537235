use std::sync::Arc;

use crate::auth::jwt::TokenService;
use crate::auth::password::PasswordHasher;
use crate::config::Config;
use crate::db::CredentialStore;
use crate::rate_limit::LoginRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub config: Config,
    pub tokens: TokenService,
    pub hasher: PasswordHasher,
    pub login_limiter: LoginRateLimiter,
}
