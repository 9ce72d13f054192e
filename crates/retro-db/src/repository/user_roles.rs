//! Role assignment repository.
//!
//! Revocation is a soft update; rows stay for audit.

use chrono::{DateTime, Utc};
use retro_common::{models::role::RoleAssignment, rbac::RoleSnapshot};
use sqlx::PgPool;
use uuid::Uuid;

/// All assignment rows for one user, including inactive ones.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<RoleAssignment>, sqlx::Error> {
    sqlx::query_as::<_, RoleAssignment>(
        "SELECT * FROM user_roles WHERE user_id = $1 ORDER BY assigned_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Every currently active assignment row. Expiry is applied by the caller.
pub async fn list_all(pool: &PgPool) -> Result<Vec<RoleAssignment>, sqlx::Error> {
    sqlx::query_as::<_, RoleAssignment>("SELECT * FROM user_roles WHERE is_active = true")
        .fetch_all(pool)
        .await
}

/// Load a user's role snapshot as of `now`.
pub async fn load_snapshot(
    pool: &PgPool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<RoleSnapshot, sqlx::Error> {
    let rows = list_for_user(pool, user_id).await?;
    Ok(RoleSnapshot::from_assignments(user_id, &rows, now))
}

/// Grant a role. Re-granting a revoked or expired role reactivates the row.
pub async fn assign_role(
    pool: &PgPool,
    user_id: Uuid,
    role_code: &str,
    expires_at: Option<DateTime<Utc>>,
    assigned_by: Uuid,
) -> Result<RoleAssignment, sqlx::Error> {
    sqlx::query_as::<_, RoleAssignment>(
        r#"
        INSERT INTO user_roles (user_id, role_code, is_active, expires_at, assigned_by, assigned_at)
        VALUES ($1, $2, true, $3, $4, NOW())
        ON CONFLICT (user_id, role_code) DO UPDATE SET
            is_active = true,
            expires_at = EXCLUDED.expires_at,
            assigned_by = EXCLUDED.assigned_by,
            assigned_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(role_code)
    .bind(expires_at)
    .bind(assigned_by)
    .fetch_one(pool)
    .await
}

/// Deactivate a role. Returns false if the user did not hold it.
pub async fn revoke_role(
    pool: &PgPool,
    user_id: Uuid,
    role_code: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_roles SET is_active = false
        WHERE user_id = $1 AND role_code = $2 AND is_active = true
        "#,
    )
    .bind(user_id)
    .bind(role_code)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
