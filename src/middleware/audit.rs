use crate::db::CredentialStore;
use crate::models::NewAuditEvent;

/// Record an audit event. Called explicitly in handlers after mutations;
/// a failed write is logged and never fails the request.
pub async fn log_event(
    store: &dyn CredentialStore,
    user_id: Option<&str>,
    action: &str,
    table_name: &str,
    record_id: Option<&str>,
    details: Option<serde_json::Value>,
) {
    let event = NewAuditEvent {
        user_id: user_id.map(str::to_string),
        action: action.to_string(),
        table_name: Some(table_name.to_string()),
        record_id: record_id.map(str::to_string),
        details,
        ip_address: None,
    };

    if let Err(e) = store.record_audit(event).await {
        tracing::error!("Failed to log audit event: {e}");
    }
}
