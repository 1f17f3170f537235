use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{self, CredentialStore, StoreError};
use crate::models::{
    AuditEvent, AuditFilter, NewAuditEvent, NewRole, NewUser, Role, User, UserChanges, UserFilter,
    UserWithRole,
};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translate constraint violations into the store's own error variants.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_pkey") => return StoreError::DuplicateUserId,
                Some("users_username_key") => return StoreError::DuplicateUsername,
                Some("users_email_key") => return StoreError::DuplicateEmail,
                Some("roles_pkey") => return StoreError::DuplicateRoleId,
                Some("roles_name_key") => return StoreError::DuplicateRoleName,
                _ => {}
            }
        }
        if db_err.is_foreign_key_violation() && db_err.constraint() == Some("users_role_id_fkey") {
            return StoreError::InvalidRole;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserWithRole>, StoreError> {
        Ok(db::users::find_by_username(&self.pool, username).await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserWithRole>, StoreError> {
        Ok(db::users::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(db::users::find_by_email(&self.pool, email).await?)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let id = new.id.clone().unwrap_or_else(db::new_id);
        db::users::create(&self.pool, &id, &new)
            .await
            .map_err(map_write_error)
    }

    async fn update_user(&self, id: &str, changes: UserChanges) -> Result<Option<User>, StoreError> {
        db::users::update(&self.pool, id, &changes)
            .await
            .map_err(map_write_error)
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, StoreError> {
        Ok(db::users::update_password(&self.pool, id, password_hash).await?)
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<bool, StoreError> {
        Ok(db::users::set_active(&self.pool, id, active).await?)
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserWithRole>, StoreError> {
        let (skip, limit) = db::page(filter.skip, filter.limit);
        Ok(db::users::list(&self.pool, filter, skip, limit).await?)
    }

    async fn find_role(&self, id: &str) -> Result<Option<Role>, StoreError> {
        Ok(db::roles::find_by_id(&self.pool, id).await?)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(db::roles::find_by_name(&self.pool, name).await?)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(db::roles::list(&self.pool).await?)
    }

    async fn create_role(&self, new: NewRole) -> Result<Role, StoreError> {
        let id = new.id.clone().unwrap_or_else(db::new_id);
        db::roles::create(&self.pool, &id, &new)
            .await
            .map_err(map_write_error)
    }

    async fn record_audit(&self, event: NewAuditEvent) -> Result<(), StoreError> {
        Ok(db::audit::log_event(&self.pool, &db::new_id(), &event).await?)
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, StoreError> {
        let (skip, limit) = db::page(filter.skip, filter.limit);
        Ok(db::audit::list(&self.pool, filter, skip, limit).await?)
    }
}
