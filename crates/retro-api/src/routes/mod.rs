pub mod health;
pub mod retrospectives;
pub mod roles;
pub mod voting;

use chrono::Utc;
use retro_common::{
    error::{RetroError, RetroResult},
    models::retrospective::Retrospective,
    rbac::RoleSnapshot,
};
use retro_db::repository::{retrospectives as retro_repo, user_roles};
use uuid::Uuid;

use crate::{AppState, middleware::AuthContext};

/// The caller's current roles, read fresh on every request so revocations
/// and expiries apply immediately.
pub(crate) async fn actor(state: &AppState, auth: &AuthContext) -> RetroResult<RoleSnapshot> {
    Ok(user_roles::load_snapshot(&state.db.pool, auth.user_id, Utc::now()).await?)
}

pub(crate) async fn find_retrospective(state: &AppState, id: Uuid) -> RetroResult<Retrospective> {
    retro_repo::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| RetroError::not_found("Retrospective"))
}
