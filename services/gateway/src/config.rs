//! Configuration for the gateway service.

use std::time::Duration;

use conduit_auth_core::AuthConfig;
use conduit_types::{Identity, OperatingMode, UserId};

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Auth core configuration
    pub auth: AuthConfig,

    /// Users the in-memory store starts with
    pub seed_users: Vec<Identity>,

    /// Timeout for plain HTTP requests
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server port
        let http_port = var("HTTP_PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Signing secret (optional, short values only warn)
        let auth = match var("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => {
                AuthConfig::try_new(secret).map_err(|e| ConfigError::AuthConfig(e.to_string()))?
            }
            None => {
                tracing::warn!("JWT_SECRET not set, using the insecure development secret");
                AuthConfig::development()
            }
        };

        let mode = OperatingMode::from_flag(var("IS_PLATFORM").as_deref());
        let auth = auth.with_mode(mode).with_api_key(var("API_KEY"));

        let seed_users = match var("GATEWAY_USERS") {
            Some(raw) => parse_users(&raw)?,
            None => Vec::new(),
        };

        // Request timeout (default 30 seconds)
        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        Ok(Self {
            http_port,
            auth,
            seed_users,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

/// Parse `id:username` pairs separated by commas.
fn parse_users(raw: &str) -> Result<Vec<Identity>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, username) = entry
                .split_once(':')
                .ok_or(ConfigError::Invalid("GATEWAY_USERS"))?;
            let id = UserId::parse(id).map_err(|_| ConfigError::Invalid("GATEWAY_USERS"))?;
            let username = username.trim();
            if username.is_empty() {
                return Err(ConfigError::Invalid("GATEWAY_USERS"));
            }
            Ok(Identity::new(id, username))
        })
        .collect()
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Auth config error: {0}")]
    AuthConfig(String),
}
