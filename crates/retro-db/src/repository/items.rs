//! Item and group repository.

use retro_common::models::{
    item::{Item, ItemGroup},
    vote::{VoteTarget, VoteTargetType},
};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a feedback item.
pub async fn create_item(
    pool: &PgPool,
    id: Uuid,
    retrospective_id: Uuid,
    group_id: Option<Uuid>,
    author_id: Uuid,
    content: &str,
) -> Result<Item, sqlx::Error> {
    sqlx::query_as::<_, Item>(
        r#"
        INSERT INTO items (id, retrospective_id, group_id, author_id, content, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(retrospective_id)
    .bind(group_id)
    .bind(author_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

/// Create an item group.
pub async fn create_group(
    pool: &PgPool,
    id: Uuid,
    retrospective_id: Uuid,
    name: &str,
) -> Result<ItemGroup, sqlx::Error> {
    sqlx::query_as::<_, ItemGroup>(
        r#"
        INSERT INTO item_groups (id, retrospective_id, name, created_at)
        VALUES ($1, $2, $3, NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(retrospective_id)
    .bind(name)
    .fetch_one(pool)
    .await
}

/// Move items of the same retrospective into a group. Returns how many moved.
pub async fn assign_items_to_group(
    pool: &PgPool,
    retrospective_id: Uuid,
    group_id: Uuid,
    item_ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE items SET group_id = $1 WHERE retrospective_id = $2 AND id = ANY($3)",
    )
    .bind(group_id)
    .bind(retrospective_id)
    .bind(item_ids)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// List items of a retrospective in creation order.
pub async fn list_items(pool: &PgPool, retrospective_id: Uuid) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(
        "SELECT * FROM items WHERE retrospective_id = $1 ORDER BY id",
    )
    .bind(retrospective_id)
    .fetch_all(pool)
    .await
}

/// Whether `target` exists inside the given retrospective.
pub async fn target_exists(
    pool: &PgPool,
    retrospective_id: Uuid,
    target: VoteTarget,
) -> Result<bool, sqlx::Error> {
    let sql = match target.target_type {
        VoteTargetType::Item => {
            "SELECT EXISTS(SELECT 1 FROM items WHERE id = $1 AND retrospective_id = $2)"
        }
        VoteTargetType::Group => {
            "SELECT EXISTS(SELECT 1 FROM item_groups WHERE id = $1 AND retrospective_id = $2)"
        }
    };
    let row: (bool,) = sqlx::query_as(sql)
        .bind(target.target_id)
        .bind(retrospective_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
