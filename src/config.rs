use std::net::IpAddr;

use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub token: TokenConfig,
    pub hash_cost: HashCost,
    pub host: IpAddr,
    pub port: u16,
    pub registration: RegistrationMode,
    pub cors_origins: Vec<String>,
    pub seed: Option<SeedConfig>,
    pub log_level: String,
}

/// Signing settings for session tokens. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl: Duration,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub admin_password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationMode {
    Open,
    Closed,
}

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 480;
pub const RECOMMENDED_SECRET_LEN: usize = 32;

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let token = TokenConfig {
            secret: env_required("QMS_JWT_SECRET")?,
            algorithm: parse_algorithm(&env_or("QMS_JWT_ALGORITHM", "HS256"))?,
            ttl: parse_ttl_minutes(&env_or(
                "QMS_TOKEN_TTL_MINUTES",
                &DEFAULT_TOKEN_TTL_MINUTES.to_string(),
            ))?,
        };

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: env_or("QMS_ARGON2_MEMORY_KIB", &defaults.memory_kib.to_string())
                .parse()
                .map_err(|e| format!("Invalid QMS_ARGON2_MEMORY_KIB: {e}"))?,
            iterations: env_or("QMS_ARGON2_ITERATIONS", &defaults.iterations.to_string())
                .parse()
                .map_err(|e| format!("Invalid QMS_ARGON2_ITERATIONS: {e}"))?,
        };

        let host: IpAddr = env_or("QMS_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid QMS_HOST: {e}"))?;

        let port: u16 = env_or("QMS_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid QMS_PORT: {e}"))?;

        let registration = match env_or("QMS_REGISTRATION", "closed").as_str() {
            "open" => RegistrationMode::Open,
            _ => RegistrationMode::Closed,
        };

        let cors_origins = env_or("QMS_CORS_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let seed = match env_or("QMS_SEED", "false").as_str() {
            "true" | "1" => Some(SeedConfig {
                admin_password: env_or("QMS_SEED_ADMIN_PASSWORD", "Admin@123"),
            }),
            _ => None,
        };

        let log_level = env_or("QMS_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            token,
            hash_cost,
            host,
            port,
            registration,
            cors_origins,
            seed,
            log_level,
        })
    }
}

/// Token lifetime in whole minutes. Must be positive and representable.
pub fn parse_ttl_minutes(raw: &str) -> Result<Duration, String> {
    let minutes: i64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("Invalid QMS_TOKEN_TTL_MINUTES: {e}"))?;
    if minutes <= 0 {
        return Err("QMS_TOKEN_TTL_MINUTES must be positive".to_string());
    }
    Duration::try_minutes(minutes)
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| format!("QMS_TOKEN_TTL_MINUTES is out of range: {minutes}"))
}

/// Only HMAC algorithms are accepted: the service holds a single shared secret.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, String> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(format!(
            "Unsupported QMS_JWT_ALGORITHM '{other}': expected HS256, HS384 or HS512"
        )),
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
