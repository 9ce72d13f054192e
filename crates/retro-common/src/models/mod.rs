//! Core domain models shared across all Retro services.
//!
//! These are the "truth" types: what the database stores and the API
//! serializes. Row types derive `sqlx::FromRow`; request types derive
//! `validator::Validate`.

pub mod item;
pub mod retrospective;
pub mod role;
pub mod user;
pub mod vote;

pub use item::*;
pub use retrospective::*;
pub use role::*;
pub use user::*;
pub use vote::*;
