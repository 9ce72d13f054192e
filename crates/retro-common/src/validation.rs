//! Input validation utilities.
//!
//! Centralized validation helpers used across API routes.

use validator::Validate;

use crate::error::RetroError;

/// Validate a request body, returning a RetroError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), RetroError> {
    body.validate().map_err(|e| RetroError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .errors()
        .iter()
        .flat_map(|(field, kind)| {
            let errs: &[validator::ValidationError] = match kind {
                validator::ValidationErrorsKind::Field(errs) => errs.as_slice(),
                _ => &[],
            };
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Reject names that are empty once trimmed.
pub fn validate_name(name: &str) -> Result<(), RetroError> {
    if name.trim().is_empty() {
        return Err(RetroError::Validation {
            message: "Name cannot be empty or whitespace only".into(),
        });
    }
    Ok(())
}
