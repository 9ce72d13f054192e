//! User directory repository.

use chrono::{DateTime, Utc};
use retro_common::{
    models::{role::RoleAssignment, user::{DirectoryUser, User}},
    rbac::RoleSnapshot,
};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::user_roles;

/// Make sure a directory entry exists for an authenticated caller.
///
/// Identities come from the token issuer; the first request from a new
/// subject provisions the row. The username is refreshed on every call.
pub async fn upsert_user(pool: &PgPool, id: Uuid, username: &str) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, created_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(username)
    .fetch_one(pool)
    .await
}

/// Find a user by their unique ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List all users, oldest first.
pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, id")
        .fetch_all(pool)
        .await
}

/// The whole directory with each user's role snapshot as of `now`.
pub async fn list_directory(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<DirectoryUser>, sqlx::Error> {
    let users = list_users(pool).await?;
    let assignments = user_roles::list_all(pool).await?;
    Ok(build_directory(users, &assignments, now))
}

fn build_directory(
    users: Vec<User>,
    assignments: &[RoleAssignment],
    now: DateTime<Utc>,
) -> Vec<DirectoryUser> {
    let mut by_user: HashMap<Uuid, Vec<RoleAssignment>> = HashMap::new();
    for a in assignments {
        by_user.entry(a.user_id).or_default().push(a.clone());
    }

    users
        .into_iter()
        .map(|user| {
            let rows = by_user.get(&user.id).map(Vec::as_slice).unwrap_or(&[]);
            let roles = RoleSnapshot::from_assignments(user.id, rows, now);
            DirectoryUser { user, roles }
        })
        .collect()
}
