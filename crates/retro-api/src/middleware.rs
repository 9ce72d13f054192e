//! Middleware: bearer authentication with just-in-time user provisioning,
//! and security headers.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use retro_common::{auth, error::RetroError};
use retro_db::repository::users;
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;

/// Authentication context extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
}

/// Validate the `Authorization: Bearer <token>` header and make sure the
/// caller has a row in `users`.
///
/// Identity lives upstream, so the first request from a new subject
/// creates the user; later requests keep the username in sync.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, RetroError> {
    let token = bearer_token(&request)?;

    let config = retro_common::config::get();
    let claims = auth::validate_token(token, &config.auth.jwt_secret)
        .map_err(|_| RetroError::InvalidToken)?;

    if claims.token_type != auth::ACCESS_TOKEN {
        return Err(RetroError::InvalidToken);
    }

    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| RetroError::InvalidToken)?;

    users::upsert_user(&state.db.pool, user_id, &claims.username).await?;

    request.extensions_mut().insert(AuthContext {
        user_id,
        username: claims.username,
    });

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Result<&str, RetroError> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(RetroError::Unauthorized)
}

// ── Security headers ──────────────────────────────────────────────────────────

/// Add security headers to every HTTP response.
///
/// Headers applied:
/// - `X-Content-Type-Options: nosniff`
/// - `X-Frame-Options: DENY`
/// - `Referrer-Policy: strict-origin-when-cross-origin`
/// - `Strict-Transport-Security` (2 years)
/// - `Content-Security-Policy` locked down for a JSON API
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let h = response.headers_mut();

    const HEADERS: [(&str, &str); 5] = [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
        ("strict-transport-security", "max-age=63072000; includeSubDomains"),
        ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
    ];
    for (name, value) in HEADERS {
        h.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    response
}
