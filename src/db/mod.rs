//! Credential store: the users, roles and audit relations the auth core reads and writes.
//!
//! Handlers only see [`CredentialStore`]. [`pg::PgStore`] backs it with Postgres;
//! [`memory::MemoryStore`] keeps everything in process for development and tests.

pub mod audit;
pub mod memory;
pub mod pg;
pub mod roles;
pub mod users;

use async_trait::async_trait;

use crate::models::{
    AuditEvent, AuditFilter, NewAuditEvent, NewRole, NewUser, Role, User, UserChanges, UserFilter,
    UserWithRole,
};

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug)]
pub enum StoreError {
    DuplicateUserId,
    DuplicateUsername,
    DuplicateEmail,
    DuplicateRoleId,
    DuplicateRoleName,
    InvalidRole,
    Database(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DuplicateUserId => write!(f, "User ID already exists"),
            StoreError::DuplicateUsername => write!(f, "Username already taken"),
            StoreError::DuplicateEmail => write!(f, "Email already registered"),
            StoreError::DuplicateRoleId => write!(f, "Role ID already exists"),
            StoreError::DuplicateRoleName => write!(f, "Role name already exists"),
            StoreError::InvalidRole => write!(f, "Invalid role ID"),
            StoreError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Every write is a single-row statement; nothing here spans a transaction.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact, case-sensitive lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserWithRole>, StoreError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<UserWithRole>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;
    async fn update_user(&self, id: &str, changes: UserChanges) -> Result<Option<User>, StoreError>;
    /// Returns false when no such user exists.
    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, StoreError>;
    async fn set_active(&self, id: &str, active: bool) -> Result<bool, StoreError>;
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserWithRole>, StoreError>;

    async fn find_role(&self, id: &str) -> Result<Option<Role>, StoreError>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;
    async fn create_role(&self, new: NewRole) -> Result<Role, StoreError>;

    async fn record_audit(&self, event: NewAuditEvent) -> Result<(), StoreError>;
    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, StoreError>;
}

pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Clamp paging input to `skip >= 0` and `1 <= limit <= 100`.
pub fn page(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.clamp(1, 100))
}
