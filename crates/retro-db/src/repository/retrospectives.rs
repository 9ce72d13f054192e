//! Retrospective repository: also the configuration store for vote caps.

use retro_common::models::retrospective::Retrospective;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new retrospective.
pub async fn create_retrospective(
    pool: &PgPool,
    id: Uuid,
    team_id: Uuid,
    name: &str,
    max_votes_per_item: i32,
    max_total_votes: i32,
    created_by: Uuid,
) -> Result<Retrospective, sqlx::Error> {
    sqlx::query_as::<_, Retrospective>(
        r#"
        INSERT INTO retrospectives (id, team_id, name, max_votes_per_item, max_total_votes, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(team_id)
    .bind(name)
    .bind(max_votes_per_item)
    .bind(max_total_votes)
    .bind(created_by)
    .fetch_one(pool)
    .await
}

/// Find a retrospective by ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Retrospective>, sqlx::Error> {
    sqlx::query_as::<_, Retrospective>("SELECT * FROM retrospectives WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Update one or both vote caps.
pub async fn update_vote_limits(
    pool: &PgPool,
    id: Uuid,
    max_votes_per_item: Option<i32>,
    max_total_votes: Option<i32>,
) -> Result<Retrospective, sqlx::Error> {
    sqlx::query_as::<_, Retrospective>(
        r#"
        UPDATE retrospectives SET
            max_votes_per_item = COALESCE($2, max_votes_per_item),
            max_total_votes = COALESCE($3, max_total_votes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(max_votes_per_item)
    .bind(max_total_votes)
    .fetch_one(pool)
    .await
}
