//! Vote repository: per-user vote counts per target.

use retro_common::models::vote::{VoteRecord, VoteTarget};
use sqlx::PgPool;
use uuid::Uuid;

/// Every vote record of a retrospective, across all users.
pub async fn list_for_retrospective(
    pool: &PgPool,
    retrospective_id: Uuid,
) -> Result<Vec<VoteRecord>, sqlx::Error> {
    sqlx::query_as::<_, VoteRecord>(
        "SELECT * FROM votes WHERE retrospective_id = $1 ORDER BY user_id, target_type, target_id",
    )
    .bind(retrospective_id)
    .fetch_all(pool)
    .await
}

/// Write the absolute count for one (user, target). Idempotent: replaying
/// the same write leaves the same row.
pub async fn upsert_vote(
    pool: &PgPool,
    user_id: Uuid,
    retrospective_id: Uuid,
    target: VoteTarget,
    count: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO votes (user_id, retrospective_id, target_type, target_id, count, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (user_id, retrospective_id, target_type, target_id)
        DO UPDATE SET count = EXCLUDED.count, updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(retrospective_id)
    .bind(target.target_type)
    .bind(target.target_id)
    .bind(count)
    .execute(pool)
    .await?;
    Ok(())
}
