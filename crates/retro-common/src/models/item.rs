//! Feedback items and item groups: the things people vote on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: Uuid,
    pub retrospective_id: Uuid,
    pub group_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemGroup {
    pub id: Uuid,
    pub retrospective_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 2000, message = "Item must be 1-2000 characters"))]
    pub content: String,

    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 120, message = "Group name must be 1-120 characters"))]
    pub name: String,

    /// Items moved into the new group.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub item_ids: Vec<Uuid>,
}
