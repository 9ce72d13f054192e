//! Role hierarchy and permission evaluation.
//!
//! Retro has four fixed roles ordered by privilege:
//! `ROLE_MEMBER` (1) < `ROLE_FACILITATOR` (2) < `ROLE_SUPERVISOR` (3) < `ROLE_ADMIN` (4).
//!
//! Everything here is a pure function over a [`RoleSnapshot`], an immutable
//! set of the role codes a user holds *right now*. Callers load the snapshot
//! from the user directory once per request and pass it in explicitly.
//!
//! Two checks look alike but differ:
//! - **manage** (`actor > target`): acting on a user who already holds a role.
//!   Peers can never manage each other.
//! - **assign** (`role <= actor`): granting a role. An admin may grant admin.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RetroError;
use crate::models::role::RoleAssignment;

/// A fixed role. The discriminant is the role's ordinal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_MEMBER")]
    Member = 1,
    #[serde(rename = "ROLE_FACILITATOR")]
    Facilitator = 2,
    #[serde(rename = "ROLE_SUPERVISOR")]
    Supervisor = 3,
    #[serde(rename = "ROLE_ADMIN")]
    Admin = 4,
}

impl Role {
    /// All roles, lowest level first.
    pub const ALL: [Role; 4] = [Role::Member, Role::Facilitator, Role::Supervisor, Role::Admin];

    pub const fn code(self) -> &'static str {
        match self {
            Role::Member => "ROLE_MEMBER",
            Role::Facilitator => "ROLE_FACILITATOR",
            Role::Supervisor => "ROLE_SUPERVISOR",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    pub const fn level(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }

    /// Permissions granted by this role alone, derived from the resource table.
    pub fn permissions(self) -> Permissions {
        if self == Role::Admin {
            return Permissions::all();
        }
        Resource::ALL
            .into_iter()
            .flat_map(|r| Action::ALL.into_iter().map(move |a| (r, a)))
            .filter(|&(r, a)| minimum_role(r, a) <= self)
            .fold(Permissions::empty(), |acc, (r, a)| acc | Permissions::of(r, a))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Role {
    type Err = RetroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| RetroError::not_found("Role"))
    }
}

/// Resources guarded by the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Team = 0,
    Retrospective = 1,
    User = 2,
    Organization = 3,
    System = 4,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Team,
        Resource::Retrospective,
        Resource::User,
        Resource::Organization,
        Resource::System,
    ];
}

/// Actions on a resource. `Manage` covers the resource-specific elevated
/// operation: team membership, opening/closing voting, role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View = 0,
    Create = 1,
    Edit = 2,
    Delete = 3,
    Manage = 4,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Manage,
    ];
}

bitflags! {
    /// Granted permission codes, one bit per (resource, action) pair.
    ///
    /// Bit layout is `resource * 5 + action`, so [`Permissions::of`] can
    /// address a flag without a lookup table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        const TEAM_VIEW              = 1 << 0;
        const TEAM_CREATE            = 1 << 1;
        const TEAM_EDIT              = 1 << 2;
        const TEAM_DELETE            = 1 << 3;
        /// Add and remove team members
        const TEAM_MANAGE            = 1 << 4;

        const RETROSPECTIVE_VIEW     = 1 << 5;
        const RETROSPECTIVE_CREATE   = 1 << 6;
        const RETROSPECTIVE_EDIT     = 1 << 7;
        const RETROSPECTIVE_DELETE   = 1 << 8;
        /// Facilitate: open and close voting
        const RETROSPECTIVE_MANAGE   = 1 << 9;

        const USER_VIEW              = 1 << 10;
        const USER_CREATE            = 1 << 11;
        const USER_EDIT              = 1 << 12;
        const USER_DELETE            = 1 << 13;
        /// Assign and revoke roles
        const USER_MANAGE            = 1 << 14;

        const ORGANIZATION_VIEW      = 1 << 15;
        const ORGANIZATION_CREATE    = 1 << 16;
        const ORGANIZATION_EDIT      = 1 << 17;
        const ORGANIZATION_DELETE    = 1 << 18;
        const ORGANIZATION_MANAGE    = 1 << 19;

        const SYSTEM_VIEW            = 1 << 20;
        const SYSTEM_CREATE          = 1 << 21;
        const SYSTEM_EDIT            = 1 << 22;
        const SYSTEM_DELETE          = 1 << 23;
        const SYSTEM_MANAGE          = 1 << 24;
    }
}

impl Permissions {
    /// The single flag for a (resource, action) pair.
    pub fn of(resource: Resource, action: Action) -> Self {
        Self::from_bits_retain(1 << (resource as u32 * 5 + action as u32))
    }

    /// Permission codes contained in this set, e.g. `["TEAM_VIEW", "USER_VIEW"]`.
    pub fn codes(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// The static permission table: minimum role for each (resource, action).
pub const fn minimum_role(resource: Resource, action: Action) -> Role {
    use Action::*;
    match (resource, action) {
        (Resource::Team, View) => Role::Member,
        (Resource::Team, Create | Edit | Manage) => Role::Facilitator,
        (Resource::Team, Delete) => Role::Supervisor,

        (Resource::Retrospective, View) => Role::Member,
        (Resource::Retrospective, Create | Edit | Delete | Manage) => Role::Facilitator,

        (Resource::User, View) => Role::Member,
        (Resource::User, Create | Edit | Manage) => Role::Supervisor,
        (Resource::User, Delete) => Role::Admin,

        (Resource::Organization, View) => Role::Member,
        (Resource::Organization, Edit) => Role::Supervisor,
        (Resource::Organization, Create | Delete | Manage) => Role::Admin,

        (Resource::System, _) => Role::Admin,
    }
}

/// Ordinal level of a role code; unknown codes carry no privilege.
pub fn level_of(code: &str) -> u8 {
    Role::from_code(code).map_or(0, Role::level)
}

/// Highest level across a set of active role codes; `0` when empty.
pub fn effective_level<I>(codes: I) -> u8
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| level_of(c.as_ref()))
        .max()
        .unwrap_or(0)
}

/// Whether an actor may act on a user at `target_level`. Equal levels never qualify.
pub fn can_manage(actor_level: u8, target_level: u8) -> bool {
    actor_level > target_level
}

/// Roles strictly below the actor's level.
pub fn manageable_roles(actor_level: u8) -> BTreeSet<Role> {
    Role::ALL
        .into_iter()
        .filter(|r| r.level() < actor_level)
        .collect()
}

/// Roles at or below the actor's level.
pub fn assignable_roles(actor_level: u8) -> BTreeSet<Role> {
    Role::ALL
        .into_iter()
        .filter(|r| r.level() <= actor_level)
        .collect()
}

/// Resource check against the static table. Admins always pass.
pub fn is_allowed(level: u8, resource: Resource, action: Action) -> bool {
    level >= Role::Admin.level() || level >= minimum_role(resource, action).level()
}

/// Immutable snapshot of one user's active role codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSnapshot {
    pub user_id: Uuid,
    roles: BTreeSet<String>,
}

impl RoleSnapshot {
    pub fn new<I>(user_id: Uuid, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            user_id,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a snapshot from assignment rows, dropping revoked and expired
    /// ones and rows that belong to other users.
    pub fn from_assignments(
        user_id: Uuid,
        assignments: &[RoleAssignment],
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            assignments
                .iter()
                .filter(|a| a.user_id == user_id && a.is_effective(now))
                .map(|a| a.role_code.clone()),
        )
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn level(&self) -> u8 {
        effective_level(&self.roles)
    }

    pub fn highest_role(&self) -> Option<Role> {
        self.roles.iter().filter_map(|c| Role::from_code(c)).max()
    }

    pub fn permissions(&self) -> Permissions {
        self.highest_role()
            .map_or(Permissions::empty(), Role::permissions)
    }

    pub fn can_manage(&self, target: &RoleSnapshot) -> bool {
        can_manage(self.level(), target.level())
    }

    pub fn is_allowed(&self, resource: Resource, action: Action) -> bool {
        is_allowed(self.level(), resource, action)
    }

    /// Like [`is_allowed`](Self::is_allowed) but fails with the missing permission code.
    pub fn authorize(&self, resource: Resource, action: Action) -> Result<(), RetroError> {
        if self.is_allowed(resource, action) {
            return Ok(());
        }
        Err(RetroError::MissingPermission {
            permission: Permissions::of(resource, action).codes().join(","),
        })
    }
}

impl AsRef<RoleSnapshot> for RoleSnapshot {
    fn as_ref(&self) -> &RoleSnapshot {
        self
    }
}

/// Candidates the actor may manage: strictly lower level, never the actor.
pub fn filter_users_manageable_by<T>(
    actor: &RoleSnapshot,
    candidates: impl IntoIterator<Item = T>,
) -> Vec<T>
where
    T: AsRef<RoleSnapshot>,
{
    let actor_level = actor.level();
    candidates
        .into_iter()
        .filter(|c| {
            let c = c.as_ref();
            c.user_id != actor.user_id && can_manage(actor_level, c.level())
        })
        .collect()
}

/// Whether `actor` may grant `role` to `target`.
///
/// Needs `user:manage`, a role at or below the actor's own level, and a
/// target strictly below the actor. A supervisor can raise a member to
/// supervisor but cannot touch another supervisor.
pub fn check_assign(
    actor: &RoleSnapshot,
    target: &RoleSnapshot,
    role: Role,
) -> Result<(), RetroError> {
    actor.authorize(Resource::User, Action::Manage)?;
    if !assignable_roles(actor.level()).contains(&role) || !actor.can_manage(target) {
        return Err(RetroError::Forbidden);
    }
    Ok(())
}

/// Whether `actor` may revoke any role from `target`.
pub fn check_revoke(actor: &RoleSnapshot, target: &RoleSnapshot) -> Result<(), RetroError> {
    actor.authorize(Resource::User, Action::Manage)?;
    if !actor.can_manage(target) {
        return Err(RetroError::Forbidden);
    }
    Ok(())
}
