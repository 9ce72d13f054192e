//! Shared JWT utilities.
//!
//! Retro does not own user credentials: tokens are minted by the operator
//! CLI or an upstream identity provider sharing the HS256 secret. The API
//! only needs to validate them and learn who the caller is.

use anyhow::Context;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token type accepted by the API middleware.
pub const ACCESS_TOKEN: &str = "access";

/// JWT claims embedded in access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as string)
    pub sub: String,
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Token type ("access")
    pub token_type: String,
}

/// Generate a signed access token for a user.
pub fn generate_access_token(
    user_id: Uuid,
    username: &str,
    secret: &str,
    ttl_secs: u64,
) -> anyhow::Result<String> {
    let now = Utc::now();
    let ttl = i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .context("access token TTL out of range")?;
    let exp = now
        .checked_add_signed(ttl)
        .context("access token expiry out of range")?;
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: ACCESS_TOKEN.to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Validate and decode a JWT token.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
