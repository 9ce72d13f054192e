//! User model: identity as seen by the user directory.
//!
//! Retro stores only what it needs to show a participant: credentials and
//! profile management belong to the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::RoleSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A directory entry: the user plus their currently active roles.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
    pub user: User,
    pub roles: RoleSnapshot,
}

impl AsRef<RoleSnapshot> for DirectoryUser {
    fn as_ref(&self) -> &RoleSnapshot {
        &self.roles
    }
}

/// Directory entry as returned by the API.
#[derive(Debug, Serialize)]
pub struct DirectoryUserResponse {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub roles: Vec<String>,
    pub level: u8,
}

impl From<DirectoryUser> for DirectoryUserResponse {
    fn from(d: DirectoryUser) -> Self {
        Self {
            id: d.user.id,
            username: d.user.username,
            display_name: d.user.display_name,
            level: d.roles.level(),
            roles: d.roles.roles().iter().cloned().collect(),
        }
    }
}
