use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::db::{self, CredentialStore, StoreError};
use crate::models::{
    AuditEvent, AuditFilter, NewAuditEvent, NewRole, NewUser, Role, User, UserChanges, UserFilter,
    UserWithRole,
};

/// In-process store. Uniqueness checks and the insert happen under one write
/// lock, so two concurrent registrations of the same username cannot both land.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    roles: HashMap<String, Role>,
    audit: Vec<AuditEvent>,
}

impl Inner {
    fn with_role(&self, user: &User) -> Option<UserWithRole> {
        let role = self.roles.get(&user.role_id)?;
        Some(UserWithRole {
            user: user.clone(),
            role: role.clone(),
        })
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserWithRole>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .and_then(|u| inner.with_role(u)))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserWithRole>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.users.get(id).and_then(|u| inner.with_role(u)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write();
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if inner.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::DuplicateUsername);
        }
        if !inner.roles.contains_key(&new.role_id) {
            return Err(StoreError::InvalidRole);
        }
        let id = new.id.unwrap_or_else(db::new_id);
        if inner.users.contains_key(&id) {
            return Err(StoreError::DuplicateUserId);
        }

        let now = Utc::now();
        let user = User {
            id,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            department: new.department,
            role_id: new.role_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: &str, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write();
        if !inner.users.contains_key(id) {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            if inner.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        if let Some(role_id) = &changes.role_id {
            if !inner.roles.contains_key(role_id) {
                return Err(StoreError::InvalidRole);
            }
        }

        let Some(user) = inner.users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(department) = changes.department {
            user.department = Some(department);
        }
        if let Some(role_id) = changes.role_id {
            user.role_id = role_id;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        Ok(match inner.users.get_mut(id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        Ok(match inner.users.get_mut(id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserWithRole>, StoreError> {
        let (skip, limit) = db::page(filter.skip, filter.limit);
        let inner = self.inner.read();
        let mut users: Vec<&User> = inner
            .users
            .values()
            .filter(|u| filter.is_active.is_none_or(|active| u.is_active == active))
            .filter(|u| filter.role_id.as_ref().is_none_or(|r| &u.role_id == r))
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(users
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .filter_map(|u| inner.with_role(u))
            .collect())
    }

    async fn find_role(&self, id: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.inner.read().roles.get(id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self
            .inner
            .read()
            .roles
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let mut roles: Vec<Role> = self.inner.read().roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn create_role(&self, new: NewRole) -> Result<Role, StoreError> {
        let mut inner = self.inner.write();
        let id = new.id.clone().unwrap_or_else(db::new_id);
        if inner.roles.contains_key(&id) {
            return Err(StoreError::DuplicateRoleId);
        }
        if inner.roles.values().any(|r| r.name == new.name) {
            return Err(StoreError::DuplicateRoleName);
        }

        let role = Role {
            id,
            is_superadmin: new.is_superadmin(),
            name: new.name,
            description: new.description,
            permissions: new.permissions,
            created_at: Utc::now(),
        };
        inner.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    async fn record_audit(&self, event: NewAuditEvent) -> Result<(), StoreError> {
        self.inner.write().audit.push(AuditEvent {
            id: db::new_id(),
            user_id: event.user_id,
            action: event.action,
            table_name: event.table_name,
            record_id: event.record_id,
            details: event.details,
            ip_address: event.ip_address,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, StoreError> {
        let (skip, limit) = db::page(filter.skip, filter.limit);
        let inner = self.inner.read();
        Ok(inner
            .audit
            .iter()
            .rev()
            .filter(|e| filter.user_id.is_none() || e.user_id == filter.user_id)
            .filter(|e| filter.table_name.is_none() || e.table_name == filter.table_name)
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
