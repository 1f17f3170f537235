//! Default roles and the bootstrap `admin` account.

use std::collections::BTreeMap;

use crate::auth::password::PasswordHasher;
use crate::db::{CredentialStore, StoreError};
use crate::models::{NewRole, NewUser, SUPERADMIN_ROLE_NAME};

pub const ADMIN_ROLE_ID: &str = "role-admin";
pub const ADMIN_USERNAME: &str = "admin";

fn role(id: &str, name: &str, description: &str, permissions: &[&str]) -> NewRole {
    NewRole {
        id: Some(id.to_string()),
        name: name.to_string(),
        description: Some(description.to_string()),
        permissions: permissions
            .iter()
            .map(|p| (p.to_string(), true))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn default_roles() -> Vec<NewRole> {
    vec![
        role(ADMIN_ROLE_ID, SUPERADMIN_ROLE_NAME, "Full system access", &["all"]),
        role(
            "role-qa-manager",
            "QA Manager",
            "Quality Assurance Manager",
            &["nc.create", "nc.approve", "capa.create", "capa.approve", "audit.create"],
        ),
        role(
            "role-qa-engineer",
            "QA Engineer",
            "Quality Assurance Engineer",
            &["nc.create", "nc.view", "capa.create", "capa.view"],
        ),
        role(
            "role-production",
            "Production Manager",
            "Production/Manufacturing Manager",
            &["wo.create", "wo.approve", "item.view"],
        ),
        role(
            "role-operator",
            "Operator",
            "Production Operator",
            &["wo.view", "wo.update"],
        ),
    ]
}

/// Seed roles and the admin user. Does nothing when any role already exists.
/// Returns whether seeding happened.
pub async fn ensure_defaults(
    store: &dyn CredentialStore,
    hasher: &PasswordHasher,
    admin_password: &str,
) -> Result<bool, String> {
    let existing = store.list_roles().await.map_err(|e| e.to_string())?;
    if !existing.is_empty() {
        tracing::info!("Roles already present, skipping seed");
        return Ok(false);
    }

    for new in default_roles() {
        match store.create_role(new).await {
            Ok(role) => tracing::info!(role = %role.name, "Seeded role"),
            Err(StoreError::DuplicateRoleId | StoreError::DuplicateRoleName) => {}
            Err(e) => return Err(e.to_string()),
        }
    }

    let password_hash = hasher.hash(admin_password)?;
    store
        .create_user(NewUser {
            id: Some("user-admin".to_string()),
            email: "admin@qms-erp.com".to_string(),
            username: ADMIN_USERNAME.to_string(),
            password_hash,
            first_name: Some("System".to_string()),
            last_name: Some("Administrator".to_string()),
            department: Some("IT".to_string()),
            role_id: ADMIN_ROLE_ID.to_string(),
        })
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!(username = ADMIN_USERNAME, "Seeded admin user");
    Ok(true)
}
