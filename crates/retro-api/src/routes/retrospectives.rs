//! Retrospective routes: the meeting itself, its vote caps, and the items
//! and groups people vote on.

use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    routing::{get, patch, post},
};
use retro_common::{
    error::{RetroError, RetroResult},
    models::{
        item::{CreateGroupRequest, CreateItemRequest, Item, ItemGroup},
        retrospective::{
            CreateRetrospectiveRequest, RetrospectiveResponse, UpdateVoteLimitsRequest,
        },
        vote::VoteTarget,
    },
    rbac::{Action, Resource},
    snowflake,
    validation::{validate_name, validate_request},
};
use retro_db::repository::{items, retrospectives};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{actor, find_retrospective};
use crate::{AppState, middleware::AuthContext};

/// Retrospective routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/retrospectives", post(create_retrospective))
        .route("/retrospectives/{retro_id}", get(get_retrospective))
        .route("/retrospectives/{retro_id}/vote-limits", patch(update_vote_limits))
        .route("/retrospectives/{retro_id}/items", post(create_item))
        .route("/retrospectives/{retro_id}/groups", post(create_group))
}

#[derive(Serialize)]
struct RetrospectiveDetail {
    #[serde(flatten)]
    retrospective: RetrospectiveResponse,
    items: Vec<Item>,
    voting_active: bool,
}

/// POST /api/v1/retrospectives
async fn create_retrospective(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRetrospectiveRequest>,
) -> RetroResult<Json<RetrospectiveResponse>> {
    validate_request(&body)?;
    validate_name(&body.name)?;

    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::Create)?;

    let config = retro_common::config::get();
    let max_total = body
        .max_total_votes
        .unwrap_or(config.voting.default_max_total_votes);

    let retro = retrospectives::create_retrospective(
        &state.db.pool,
        snowflake::generate_id(),
        body.team_id,
        body.name.trim(),
        to_db_cap(body.max_votes_per_item)?,
        to_db_cap(max_total)?,
        auth.user_id,
    )
    .await?;

    tracing::info!(
        retrospective = %retro.id,
        team = %retro.team_id,
        created_by = %auth.user_id,
        max_per_item = retro.max_votes_per_item,
        max_total = retro.max_total_votes,
        "Retrospective created"
    );

    Ok(Json(retro.into()))
}

/// GET /api/v1/retrospectives/:retro_id
async fn get_retrospective(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
) -> RetroResult<Json<RetrospectiveDetail>> {
    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::View)?;

    let retro = find_retrospective(&state, retro_id).await?;
    let items = items::list_items(&state.db.pool, retro_id).await?;

    Ok(Json(RetrospectiveDetail {
        retrospective: retro.into(),
        items,
        voting_active: state.voting.is_active(retro_id).await,
    }))
}

/// PATCH /api/v1/retrospectives/:retro_id/vote-limits
///
/// Caps are frozen while voting is open; stop voting, edit, start again.
async fn update_vote_limits(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
    Json(body): Json<UpdateVoteLimitsRequest>,
) -> RetroResult<Json<RetrospectiveResponse>> {
    validate_request(&body)?;

    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::Edit)?;

    find_retrospective(&state, retro_id).await?;
    if state.voting.is_active(retro_id).await {
        return Err(RetroError::VotingOpen);
    }

    let retro = retrospectives::update_vote_limits(
        &state.db.pool,
        retro_id,
        body.max_votes_per_item.map(to_db_cap).transpose()?,
        body.max_total_votes.map(to_db_cap).transpose()?,
    )
    .await?;

    tracing::info!(
        retrospective = %retro_id,
        max_per_item = retro.max_votes_per_item,
        max_total = retro.max_total_votes,
        "Vote limits updated"
    );

    Ok(Json(retro.into()))
}

/// POST /api/v1/retrospectives/:retro_id/items: Any member may contribute.
async fn create_item(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
    Json(body): Json<CreateItemRequest>,
) -> RetroResult<Json<Item>> {
    validate_request(&body)?;

    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::View)?;

    find_retrospective(&state, retro_id).await?;
    if let Some(group_id) = body.group_id {
        let group = VoteTarget::group(group_id);
        if !items::target_exists(&state.db.pool, retro_id, group).await? {
            return Err(RetroError::not_found("Item group"));
        }
    }

    let item = items::create_item(
        &state.db.pool,
        snowflake::generate_id(),
        retro_id,
        body.group_id,
        auth.user_id,
        &body.content,
    )
    .await?;

    tracing::debug!(retrospective = %retro_id, item = %item.id, "Item created");
    Ok(Json(item))
}

/// POST /api/v1/retrospectives/:retro_id/groups
async fn create_group(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(retro_id): Path<Uuid>,
    Json(body): Json<CreateGroupRequest>,
) -> RetroResult<Json<ItemGroup>> {
    validate_request(&body)?;
    validate_name(&body.name)?;

    let me = actor(&state, &auth).await?;
    me.authorize(Resource::Retrospective, Action::Edit)?;

    find_retrospective(&state, retro_id).await?;

    let group = items::create_group(
        &state.db.pool,
        snowflake::generate_id(),
        retro_id,
        body.name.trim(),
    )
    .await?;
    let moved =
        items::assign_items_to_group(&state.db.pool, retro_id, group.id, &body.item_ids).await?;

    tracing::debug!(
        retrospective = %retro_id,
        group = %group.id,
        items = moved,
        "Group created"
    );
    Ok(Json(group))
}

fn to_db_cap(value: u32) -> RetroResult<i32> {
    i32::try_from(value).map_err(|_| RetroError::Validation {
        message: format!("Vote cap {value} is out of range"),
    })
}
