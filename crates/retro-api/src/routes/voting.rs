//! Voting routes: open and close the voting phase, cast and withdraw votes.
//!
//! Quota checks happen in memory against the open session; the response
//! carries everything the client needs to redraw the vote controls.

use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    routing::{get, post},
};
use retro_common::{
    error::{RetroError, RetroResult},
    models::vote::{VoteTarget, VoteTargetRequest, VoteTargetType},
    rbac::{Action, Resource},
    validation::validate_request,
};
use retro_voting::{SessionView, VoteChange, badge_text};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{actor, find_retrospective};
use crate::{AppState, middleware::AuthContext};

/// Voting routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/retrospectives/{retro_id}/voting", get(get_voting))
        .route("/retrospectives/{retro_id}/voting/start", post(start_voting))
        .route("/retrospectives/{retro_id}/voting/stop", post(stop_voting))
        .route("/retrospectives/{retro_id}/votes/increase", post(increase_vote))
        .route("/retrospectives/{retro_id}/votes/decrease", post(decrease_vote))
}

/// Result of one increase/decrease.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteResponse {
    target_id: Uuid,
    target_type: VoteTargetType,
    /// The caller's votes on this target.
    vote_count: u32,
    /// The caller's votes across the retrospective.
    total_votes: u32,
    /// Everyone's votes on this target.
    badge_count: u32,
    badge: String,
    can_increase: bool,
    can_decrease: bool,
}

impl From<VoteChange> for VoteResponse {
    fn from(c: VoteChange) -> Self {
        Self {
            target_id: c.target.target_id,
            target_type: c.target.target_type,
            vote_count: c.count,
            total_votes: c.user_total,
            badge_count: c.badge_count,
            badge: badge_text(c.badge_count),
            can_increase: c.controls.can_increase,
            can_decrease: c.controls.can_decrease,
        }
    }
}

/// GET /api/v1/retrospectives/:retro_id/voting
async fn get_voting(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
) -> RetroResult<Json<SessionView>> {
    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::View)?;

    find_retrospective(&state, retro_id).await?;
    Ok(Json(state.voting.view(retro_id, auth.user_id).await))
}

/// POST /api/v1/retrospectives/:retro_id/voting/start
///
/// Also the way to reconcile an open session with the database.
async fn start_voting(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
) -> RetroResult<Json<SessionView>> {
    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::Manage)?;

    state.voting.start_voting(retro_id).await?;
    Ok(Json(state.voting.view(retro_id, auth.user_id).await))
}

/// POST /api/v1/retrospectives/:retro_id/voting/stop
async fn stop_voting(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
) -> RetroResult<Json<SessionView>> {
    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::Manage)?;

    find_retrospective(&state, retro_id).await?;
    if !state.voting.stop_voting(retro_id).await {
        tracing::debug!(retrospective = %retro_id, "Stop requested but voting was not open");
    }
    Ok(Json(state.voting.view(retro_id, auth.user_id).await))
}

/// POST /api/v1/retrospectives/:retro_id/votes/increase
async fn increase_vote(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
    Json(body): Json<VoteTargetRequest>,
) -> RetroResult<Json<VoteResponse>> {
    let target = vote_target(&body)?;
    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::View)?;

    let change = state
        .voting
        .increase_vote(retro_id, auth.user_id, target)
        .await?;
    Ok(Json(change.into()))
}

/// POST /api/v1/retrospectives/:retro_id/votes/decrease
async fn decrease_vote(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
    Json(body): Json<VoteTargetRequest>,
) -> RetroResult<Json<VoteResponse>> {
    let target = vote_target(&body)?;
    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::View)?;

    let change = state
        .voting
        .decrease_vote(retro_id, auth.user_id, target)
        .await?;
    Ok(Json(change.into()))
}

fn vote_target(body: &VoteTargetRequest) -> RetroResult<VoteTarget> {
    validate_request(body)?;
    body.target().ok_or_else(|| RetroError::Validation {
        message: "Supply exactly one of itemId or groupId".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use retro_voting::VoteControls;

    #[test]
    fn vote_response_uses_client_field_names() {
        let item = Uuid::now_v7();
        let change = VoteChange {
            user_id: Uuid::now_v7(),
            target: VoteTarget::item(item),
            count: 2,
            user_total: 4,
            badge_count: 7,
            controls: VoteControls {
                can_increase: true,
                can_decrease: true,
            },
            changed: true,
        };

        let json = serde_json::to_value(VoteResponse::from(change)).unwrap();
        assert_eq!(json["targetId"], item.to_string());
        assert_eq!(json["targetType"], "item");
        assert_eq!(json["voteCount"], 2);
        assert_eq!(json["totalVotes"], 4);
        assert_eq!(json["badgeCount"], 7);
        assert_eq!(json["badge"], "7 votes");
        assert_eq!(json["canIncrease"], true);
    }

    #[test]
    fn target_requires_exactly_one_id() {
        let neither = VoteTargetRequest {
            item_id: None,
            group_id: None,
        };
        assert!(matches!(
            vote_target(&neither),
            Err(RetroError::Validation { .. })
        ));

        let group = Uuid::now_v7();
        let one = VoteTargetRequest {
            item_id: None,
            group_id: Some(group),
        };
        assert_eq!(vote_target(&one).unwrap(), VoteTarget::group(group));
    }
}
