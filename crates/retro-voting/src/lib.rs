//! # retro-voting
//!
//! Vote quotas for the voting phase of a retrospective.
//!
//! - [`quota`]: the pure evaluator: per-item and per-user-total caps,
//!   zero floor, aggregate badge counts.
//! - [`session`]: one tracker per open retrospective, held in memory, with
//!   fire-and-forget persistence through a [`store::VoteStore`].
//! - [`store`]: the persistence seam, with PostgreSQL and in-memory backends.

pub mod error;
pub mod quota;
pub mod session;
pub mod store;

pub use error::{Cap, VoteError};
pub use quota::{VoteChange, VoteControls, VoteQuotaTracker, badge_text};
pub use session::{BadgeView, SessionView, UserVoteView, VotingSessionManager};
pub use store::{MemoryVoteStore, PgVoteStore, VoteStore};
