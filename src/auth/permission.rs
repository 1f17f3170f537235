//! Flat role → permission checks.
//!
//! A role grants a permission when its map holds `true` for that exact key.
//! Superadmin roles grant everything without consulting the map. There is no
//! inheritance and no wildcard matching; the `all` key is an ordinary key here.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Role, UserWithRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub fn check(user: &UserWithRole, required: &str) -> Decision {
    check_role(&user.role, required)
}

pub fn check_role(role: &Role, required: &str) -> Decision {
    if role.is_superadmin {
        return Decision::Allow;
    }

    match role.permissions.get(required) {
        Some(true) => Decision::Allow,
        _ => Decision::Deny(format!("Permission denied: {required}")),
    }
}

/// Modules that own permission keys.
pub const MODULES: &[&str] = &[
    "doc",
    "training",
    "nc",
    "capa",
    "audit",
    "wo",
    "item",
    "inventory",
    "hr",
    "maintenance",
    "marketing",
    "purchase",
    "store",
    "mr",
    "qc",
    "user",
    "role",
];

pub const ACTIONS: &[&str] = &["view", "create", "update", "approve", "delete", "manage"];

static KEY_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)\.([a-z]+)$").expect("static regex"));

pub fn is_known_permission(key: &str) -> bool {
    if key == "all" {
        return true;
    }
    KEY_SHAPE
        .captures(key)
        .is_some_and(|caps| MODULES.contains(&&caps[1]) && ACTIONS.contains(&&caps[2]))
}

/// Reject role definitions naming permissions nobody checks.
pub fn validate_permissions(permissions: &BTreeMap<String, bool>) -> Result<(), String> {
    let unknown: Vec<&str> = permissions
        .keys()
        .map(String::as_str)
        .filter(|k| !is_known_permission(k))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(format!("Unknown permissions: {}", unknown.join(", ")))
    }
}
