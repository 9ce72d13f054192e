//! Application configuration loaded from environment variables and config files.
//!
//! Config precedence: env vars > .env file > config.toml > defaults.
//! Environment variables use the `RETRO` prefix and `__` as the section
//! separator, e.g. `RETRO__DATABASE__URL` or `RETRO__AUTH__JWT_SECRET`.

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG.get().expect("Config not initialized. Call retro_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let app_config = load(config::Environment::with_prefix("RETRO"))?;
    Ok(CONFIG.get_or_init(|| app_config))
}

/// Build a config from the defaults, an optional `config.toml`, and the given
/// environment source. Split out of [`init`] so it can be exercised without
/// touching the global.
fn load(env: config::Environment) -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 2)?
        .set_default("auth.access_token_ttl_secs", 900)? // 15 min
        .set_default("voting.default_max_total_votes", 5)?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        .add_source(env.separator("__").try_parsing(true))
        .build()?
        .try_deserialize()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub voting: VotingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret (HS256), at least 256 bits of entropy
    pub jwt_secret: String,
    /// Access token TTL in seconds
    pub access_token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VotingConfig {
    /// Total-vote cap applied to new retrospectives that don't set one.
    /// There is deliberately no default for the per-item cap.
    pub default_max_total_votes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("RETRO").source(Some(map))
    }

    #[test]
    fn defaults_fill_everything_but_secrets() {
        let cfg = load(env(&[
            ("RETRO__DATABASE__URL", "postgres://localhost/retro"),
            ("RETRO__AUTH__JWT_SECRET", "test-secret"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.voting.default_max_total_votes, 5);
        assert_eq!(cfg.auth.access_token_ttl_secs, 900);
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = load(env(&[
            ("RETRO__DATABASE__URL", "postgres://localhost/retro"),
            ("RETRO__AUTH__JWT_SECRET", "test-secret"),
            ("RETRO__VOTING__DEFAULT_MAX_TOTAL_VOTES", "8"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.voting.default_max_total_votes, 8);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let result = load(env(&[("RETRO__AUTH__JWT_SECRET", "test-secret")]));
        assert!(result.is_err());
    }
}
