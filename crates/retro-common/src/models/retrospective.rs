//! Retrospective model: the meeting, and the home of the vote caps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Retrospective {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,

    /// Most votes one user may put on a single item or group.
    pub max_votes_per_item: i32,

    /// Most votes one user may cast across the whole retrospective.
    pub max_total_votes: i32,

    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The two caps, as the vote tracker consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLimits {
    pub max_per_item: u32,
    pub max_total: u32,
}

impl From<&Retrospective> for VoteLimits {
    fn from(r: &Retrospective) -> Self {
        Self {
            max_per_item: r.max_votes_per_item.max(0) as u32,
            max_total: r.max_total_votes.max(0) as u32,
        }
    }
}

/// Create request. The per-item cap is mandatory: there is no sensible
/// product default for it.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRetrospectiveRequest {
    pub team_id: Uuid,

    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,

    #[validate(range(min = 1, max = 100, message = "max_votes_per_item must be 1-100"))]
    pub max_votes_per_item: u32,

    #[validate(range(min = 1, max = 1000, message = "max_total_votes must be 1-1000"))]
    pub max_total_votes: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVoteLimitsRequest {
    #[validate(range(min = 1, max = 100, message = "max_votes_per_item must be 1-100"))]
    pub max_votes_per_item: Option<u32>,

    #[validate(range(min = 1, max = 1000, message = "max_total_votes must be 1-1000"))]
    pub max_total_votes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RetrospectiveResponse {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub max_votes_per_item: i32,
    pub max_total_votes: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Retrospective> for RetrospectiveResponse {
    fn from(r: Retrospective) -> Self {
        Self {
            id: r.id,
            team_id: r.team_id,
            name: r.name,
            max_votes_per_item: r.max_votes_per_item,
            max_total_votes: r.max_total_votes,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}
