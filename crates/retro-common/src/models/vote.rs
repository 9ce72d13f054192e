//! Vote records and vote targets.
//!
//! A vote target is either a feedback item or a group of items. Both are
//! counted the same way, keyed by `(target_type, target_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VoteTargetType {
    Item,
    Group,
}

/// What a vote is cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTarget {
    pub target_type: VoteTargetType,
    pub target_id: Uuid,
}

impl VoteTarget {
    pub fn item(id: Uuid) -> Self {
        Self {
            target_type: VoteTargetType::Item,
            target_id: id,
        }
    }

    pub fn group(id: Uuid) -> Self {
        Self {
            target_type: VoteTargetType::Group,
            target_id: id,
        }
    }
}

/// One row of `votes`: how many votes a user put on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoteRecord {
    pub user_id: Uuid,
    pub retrospective_id: Uuid,
    pub target_type: VoteTargetType,
    pub target_id: Uuid,
    pub count: i32,
    pub updated_at: DateTime<Utc>,
}

impl VoteRecord {
    pub fn target(&self) -> VoteTarget {
        VoteTarget {
            target_type: self.target_type,
            target_id: self.target_id,
        }
    }
}

/// Body of an increase/decrease call. Exactly one id must be present.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "exactly_one_target"))]
pub struct VoteTargetRequest {
    #[serde(alias = "item_id")]
    pub item_id: Option<Uuid>,
    #[serde(alias = "group_id")]
    pub group_id: Option<Uuid>,
}

impl VoteTargetRequest {
    /// The target named by the request, if it names exactly one.
    pub fn target(&self) -> Option<VoteTarget> {
        match (self.item_id, self.group_id) {
            (Some(id), None) => Some(VoteTarget::item(id)),
            (None, Some(id)) => Some(VoteTarget::group(id)),
            _ => None,
        }
    }
}

fn exactly_one_target(req: &VoteTargetRequest) -> Result<(), ValidationError> {
    if req.target().is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("exactly_one_target");
    err.message = Some("Supply exactly one of itemId or groupId".into());
    Err(err)
}
