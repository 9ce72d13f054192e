//! Role administration routes: who holds which role, who can manage whom.

use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::Utc;
use retro_common::{
    error::{RetroError, RetroResult},
    models::{
        role::{AssignRoleRequest, RoleAssignment, RoleOverview},
        user::DirectoryUserResponse,
    },
    rbac::{self, Action, Resource, Role},
    validation::validate_request,
};
use retro_db::repository::{user_roles, users};
use std::sync::Arc;
use uuid::Uuid;

use super::actor;
use crate::{AppState, middleware::AuthContext};

/// Role routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/@me/roles", get(my_roles))
        .route("/users/manageable", get(list_manageable))
        .route("/users/{user_id}/roles", post(assign_role))
        .route("/users/{user_id}/roles/{role}", delete(revoke_role))
}

/// GET /api/v1/users/@me/roles
async fn my_roles(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> RetroResult<Json<RoleOverview>> {
    let me = actor(&state, &auth).await?;
    let level = me.level();

    Ok(Json(RoleOverview {
        user_id: me.user_id,
        roles: me.roles().iter().cloned().collect(),
        level,
        permissions: me.permissions().codes(),
        assignable_roles: rbac::assignable_roles(level).into_iter().collect(),
        manageable_roles: rbac::manageable_roles(level).into_iter().collect(),
    }))
}

/// GET /api/v1/users/manageable: Users strictly below the caller.
async fn list_manageable(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> RetroResult<Json<Vec<DirectoryUserResponse>>> {
    let me = actor(&state, &auth).await?;
    me.authorize(Resource::User, Action::View)?;

    let directory = users::list_directory(&state.db.pool, Utc::now()).await?;
    let manageable = rbac::filter_users_manageable_by(&me, directory);

    Ok(Json(manageable.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/users/:user_id/roles
async fn assign_role(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AssignRoleRequest>,
) -> RetroResult<Json<RoleAssignment>> {
    validate_request(&body)?;

    let role: Role = body.role.parse()?;

    users::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or_else(|| RetroError::not_found("User"))?;

    let me = actor(&state, &auth).await?;
    let target = user_roles::load_snapshot(&state.db.pool, user_id, Utc::now()).await?;
    rbac::check_assign(&me, &target, role)?;

    let assignment = user_roles::assign_role(
        &state.db.pool,
        user_id,
        role.code(),
        body.expires_at,
        auth.user_id,
    )
    .await?;

    tracing::info!(
        user = %user_id,
        role = %role,
        assigned_by = %auth.user_id,
        expires_at = ?body.expires_at,
        "Role assigned"
    );

    Ok(Json(assignment))
}

/// DELETE /api/v1/users/:user_id/roles/:role: Deactivate an assignment.
async fn revoke_role(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path((user_id, role_code)): Path<(Uuid, String)>,
) -> RetroResult<StatusCode> {
    let me = actor(&state, &auth).await?;
    let target = user_roles::load_snapshot(&state.db.pool, user_id, Utc::now()).await?;
    rbac::check_revoke(&me, &target)?;

    if !user_roles::revoke_role(&state.db.pool, user_id, &role_code).await? {
        return Err(RetroError::not_found("Role assignment"));
    }

    tracing::info!(
        user = %user_id,
        role = %role_code,
        revoked_by = %auth.user_id,
        "Role revoked"
    );

    Ok(StatusCode::NO_CONTENT)
}
