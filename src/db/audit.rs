use sqlx::PgPool;

use crate::models::{AuditEvent, AuditFilter, NewAuditEvent};

pub async fn log_event(pool: &PgPool, id: &str, event: &NewAuditEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs (id, user_id, action, table_name, record_id, details, ip_address)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(&event.user_id)
    .bind(&event.action)
    .bind(&event.table_name)
    .bind(&event.record_id)
    .bind(&event.details)
    .bind(&event.ip_address)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list(
    pool: &PgPool,
    filter: &AuditFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    sqlx::query_as::<_, AuditEvent>(
        "SELECT * FROM audit_logs
         WHERE ($1::text IS NULL OR user_id = $1)
           AND ($2::text IS NULL OR table_name = $2)
         ORDER BY created_at DESC, id DESC OFFSET $3 LIMIT $4",
    )
    .bind(&filter.user_id)
    .bind(&filter.table_name)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}
