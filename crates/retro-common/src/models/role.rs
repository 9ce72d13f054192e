//! Role assignment model.
//!
//! Assignments are never deleted: revoking sets `is_active = false`, and an
//! assignment whose `expires_at` has passed is ignored without being touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::rbac::Role;

/// One row of `user_roles`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role_code: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// Active and not yet expired at `now`.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|exp| exp > now)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRoleRequest {
    #[validate(length(min = 1, max = 64, message = "Role code must be 1-64 characters"))]
    pub role: String,

    /// Optional expiry; the assignment goes inert after this instant.
    pub expires_at: Option<DateTime<Utc>>,
}

/// The caller's own standing in the hierarchy.
#[derive(Debug, Serialize)]
pub struct RoleOverview {
    pub user_id: Uuid,
    pub roles: Vec<String>,
    pub level: u8,
    pub permissions: Vec<&'static str>,
    pub assignable_roles: Vec<Role>,
    pub manageable_roles: Vec<Role>,
}
