use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the built-in role that bypasses permission checks.
pub const SUPERADMIN_ROLE_NAME: &str = "System Admin";

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(json)]
    pub permissions: BTreeMap<String, bool>,
    pub is_superadmin: bool,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>, permissions: BTreeMap<String, bool>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            is_superadmin: name == SUPERADMIN_ROLE_NAME,
            name,
            description: None,
            permissions,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

impl NewRole {
    /// The superadmin flag is fixed here, at creation, from the role name.
    pub fn is_superadmin(&self) -> bool {
        self.name == SUPERADMIN_ROLE_NAME
    }
}
