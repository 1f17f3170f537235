use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub user_id: Option<String>,
    pub action: String,
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditFilter {
    pub user_id: Option<String>,
    pub table_name: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "crate::models::user::default_limit")]
    pub limit: i64,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            table_name: None,
            skip: 0,
            limit: crate::models::user::default_limit(),
        }
    }
}
