//! Repository layer: query functions organized by domain.

pub mod items;
pub mod retrospectives;
pub mod user_roles;
pub mod users;
pub mod votes;
