use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{NewUser, Role, User, UserChanges, UserFilter, UserWithRole};

const USER_WITH_ROLE: &str = "SELECT u.*,
        r.id AS r_id, r.name AS r_name, r.description AS r_description,
        r.permissions AS r_permissions, r.is_superadmin AS r_is_superadmin,
        r.created_at AS r_created_at
     FROM users u JOIN roles r ON r.id = u.role_id";

#[derive(sqlx::FromRow)]
struct UserRoleRow {
    #[sqlx(flatten)]
    user: User,
    r_id: String,
    r_name: String,
    r_description: Option<String>,
    #[sqlx(json)]
    r_permissions: BTreeMap<String, bool>,
    r_is_superadmin: bool,
    r_created_at: DateTime<Utc>,
}

impl From<UserRoleRow> for UserWithRole {
    fn from(row: UserRoleRow) -> Self {
        UserWithRole {
            user: row.user,
            role: Role {
                id: row.r_id,
                name: row.r_name,
                description: row.r_description,
                permissions: row.r_permissions,
                is_superadmin: row.r_is_superadmin,
                created_at: row.r_created_at,
            },
        }
    }
}

pub async fn create(pool: &PgPool, id: &str, new: &NewUser) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, username, password_hash, first_name, last_name, department, role_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(id)
    .bind(&new.email)
    .bind(&new.username)
    .bind(&new.password_hash)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.department)
    .bind(&new.role_id)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<UserWithRole>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRoleRow>(&format!("{USER_WITH_ROLE} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserWithRole>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRoleRow>(&format!("{USER_WITH_ROLE} WHERE u.username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool, filter: &UserFilter, skip: i64, limit: i64) -> Result<Vec<UserWithRole>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRoleRow>(&format!(
        "{USER_WITH_ROLE}
         WHERE ($1::boolean IS NULL OR u.is_active = $1)
           AND ($2::text IS NULL OR u.role_id = $2)
         ORDER BY u.created_at DESC, u.id DESC OFFSET $3 LIMIT $4"
    ))
    .bind(filter.is_active)
    .bind(&filter.role_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    changes: &UserChanges,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
            email = COALESCE($2, email),
            first_name = COALESCE($3, first_name),
            last_name = COALESCE($4, last_name),
            department = COALESCE($5, department),
            role_id = COALESCE($6, role_id),
            is_active = COALESCE($7, is_active),
            updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&changes.email)
    .bind(&changes.first_name)
    .bind(&changes.last_name)
    .bind(&changes.department)
    .bind(&changes.role_id)
    .bind(changes.is_active)
    .fetch_optional(pool)
    .await
}

pub async fn update_password(
    pool: &PgPool,
    id: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_active(pool: &PgPool, id: &str, active: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(active)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
