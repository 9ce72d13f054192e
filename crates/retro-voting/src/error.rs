//! Voting errors.
//!
//! Hitting a cap is ordinary control flow, not a fault: the caller gets
//! [`VoteError::QuotaExceeded`] naming the cap, and nothing changes.

use retro_common::error::RetroError;
use serde::Serialize;
use std::fmt;

/// Which cap stopped an increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cap", rename_all = "snake_case")]
pub enum Cap {
    PerItem { limit: u32 },
    Total { limit: u32 },
}

impl fmt::Display for Cap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cap::PerItem { limit } => write!(f, "max votes per item ({limit})"),
            Cap::Total { limit } => write!(f, "max total votes ({limit})"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("Vote limit reached: {0}")]
    QuotaExceeded(Cap),

    #[error("Vote target not found")]
    TargetNotFound,

    #[error("Retrospective not found")]
    RetrospectiveNotFound,

    #[error("Voting is not open")]
    VotingClosed,

    #[error("Vote store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<VoteError> for RetroError {
    fn from(e: VoteError) -> Self {
        match e {
            VoteError::QuotaExceeded(cap) => RetroError::QuotaExceeded {
                cap: cap.to_string(),
            },
            VoteError::TargetNotFound => RetroError::not_found("Vote target"),
            VoteError::RetrospectiveNotFound => RetroError::not_found("Retrospective"),
            VoteError::VotingClosed => RetroError::VotingClosed,
            VoteError::Store(e) => RetroError::Internal(e),
        }
    }
}
