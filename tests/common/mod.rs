#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use qms_auth::auth::jwt::TokenService;
use qms_auth::auth::password::PasswordHasher;
use qms_auth::config::{Config, HashCost, RegistrationMode, TokenConfig};
use qms_auth::db::{CredentialStore, MemoryStore, PgStore};
use qms_auth::models::{NewRole, NewUser, Role, UserWithRole};
use qms_auth::state::{AppState, SharedState};

pub const TEST_SECRET: &str = "test-jwt-secret-that-is-long-enough";
pub const ADMIN_PASSWORD: &str = "Admin@123";

/// Cheap Argon2 parameters so tests stay fast.
pub fn test_cost() -> HashCost {
    HashCost {
        memory_kib: 1024,
        iterations: 1,
    }
}

pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(test_cost()).unwrap()
}

pub fn token_config(secret: &str) -> TokenConfig {
    TokenConfig {
        secret: secret.to_string(),
        algorithm: Algorithm::HS256,
        ttl: Duration::minutes(480),
    }
}

pub fn test_tokens() -> TokenService {
    TokenService::new(&token_config(TEST_SECRET))
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        token: token_config(TEST_SECRET),
        hash_cost: test_cost(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        registration: RegistrationMode::Open,
        cors_origins: vec![],
        seed: None,
        log_level: "warn".to_string(),
    }
}

pub fn role(id: &str, name: &str, permissions: &[(&str, bool)]) -> NewRole {
    NewRole {
        id: Some(id.to_string()),
        name: name.to_string(),
        description: None,
        permissions: permissions
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
    }
}

/// Insert a user directly through the store, bypassing HTTP.
pub async fn insert_user(
    store: &dyn CredentialStore,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
    role_id: &str,
) -> UserWithRole {
    let user = store
        .create_user(NewUser {
            id: None,
            email: format!("{username}@test.com"),
            username: username.to_string(),
            password_hash: hasher.hash(password).unwrap(),
            first_name: None,
            last_name: None,
            department: None,
            role_id: role_id.to_string(),
        })
        .await
        .unwrap();
    store.find_by_id(&user.id).await.unwrap().unwrap()
}

pub fn with_role(role: Role, user: &UserWithRole) -> UserWithRole {
    UserWithRole {
        user: user.user.clone(),
        role,
    }
}

/// A running test server backed by an in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: SharedState,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.state.store.as_ref()
    }

    /// Form-encoded login, as the login endpoint expects.
    pub async fn login(&self, username: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Login as the seeded admin and return the access token.
    pub async fn admin_token(&self) -> String {
        self.token_for("admin", ADMIN_PASSWORD).await
    }

    pub async fn token_for(&self, username: &str, password: &str) -> String {
        let (body, status) = self.login(username, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn register(&self, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(body)
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Create a user through the admin API, return the user JSON.
    pub async fn create_user(&self, token: &str, username: &str, password: &str, role_id: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/users",
                token,
                &json!({
                    "email": format!("{username}@test.com"),
                    "username": username,
                    "password": password,
                    "role_id": role_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {body}");
        body
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    spawn_app_on(Arc::new(MemoryStore::new()), config).await
}

/// Spawn the app against a fresh Postgres database, or `None` when
/// `DATABASE_URL` is not set.
pub async fn spawn_pg_app() -> Option<TestApp> {
    let store = pg_store().await?;
    Some(spawn_app_on(Arc::new(store), test_config()).await)
}

/// Spawn the app on a random port with default roles and the admin user seeded.
pub async fn spawn_app_on(store: Arc<dyn CredentialStore>, config: Config) -> TestApp {
    let state: SharedState = Arc::new(AppState::new(store, config).unwrap());

    qms_auth::seed::ensure_defaults(state.store.as_ref(), &state.hasher, ADMIN_PASSWORD)
        .await
        .expect("seeding failed");

    let app = qms_auth::build_app(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        state,
        client,
    }
}

/// A `PgStore` on a freshly created, migrated database. Returns `None` when
/// `DATABASE_URL` is not set, so Postgres tests skip instead of failing.
pub async fn pg_store() -> Option<PgStore> {
    let _ = dotenvy::dotenv();

    let Some(base_url) = std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
    else {
        eprintln!("DATABASE_URL not set; skipping Postgres-backed test");
        return None;
    };

    // Create a unique test database
    let db_name = format!("qms_auth_test_{}", Uuid::now_v7().simple());

    // Connect to default postgres DB to create test DB
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    Some(PgStore::new(pool))
}
