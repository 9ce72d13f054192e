//! Centralized error type for Retro.
//!
//! Uses `thiserror` for the variants and renders every error as a JSON body
//! with a stable, machine-readable code so clients can react to quota and
//! permission failures without parsing messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Core application error type used across all Retro services.
#[derive(Debug, thiserror::Error)]
pub enum RetroError {
    // === Auth errors ===
    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized")]
    Unauthorized,

    // === Resource errors ===
    #[error("{resource} not found")]
    NotFound { resource: String },

    // === Validation errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // === Permission errors ===
    #[error("Missing permission: {permission}")]
    MissingPermission { permission: String },

    #[error("Forbidden")]
    Forbidden,

    // === Voting ===
    #[error("Vote limit reached: {cap}")]
    QuotaExceeded { cap: String },

    #[error("Voting is not open for this retrospective")]
    VotingClosed,

    #[error("Voting is open for this retrospective")]
    VotingOpen,

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    message: String,
}

impl RetroError {
    /// Shorthand for the common `NotFound` case.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidToken | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::MissingPermission { .. } | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::QuotaExceeded { .. } | Self::VotingClosed | Self::VotingOpen => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for programmatic handling by clients.
    pub fn error_code(&self) -> &str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::MissingPermission { .. } => "MISSING_PERMISSION",
            Self::Forbidden => "FORBIDDEN",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::VotingClosed => "VOTING_CLOSED",
            Self::VotingOpen => "VOTING_OPEN",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for RetroError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak internal details to clients
        let message = match &self {
            RetroError::Database(e) => {
                tracing::error!("Database error: {e}");
                "An internal error occurred".to_string()
            }
            RetroError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results using RetroError.
pub type RetroResult<T> = Result<T, RetroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_are_conflicts_not_server_faults() {
        let err = RetroError::QuotaExceeded {
            cap: "max votes per item (3)".into(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
        assert!(err.to_string().contains("max votes per item"));
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = RetroError::not_found("Vote target");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Vote target not found");
    }

    #[test]
    fn session_state_errors_are_conflicts() {
        for (err, code) in [
            (RetroError::VotingClosed, "VOTING_CLOSED"),
            (RetroError::VotingOpen, "VOTING_OPEN"),
        ] {
            assert_eq!(err.status_code(), StatusCode::CONFLICT);
            assert_eq!(err.error_code(), code);
        }
    }
}
