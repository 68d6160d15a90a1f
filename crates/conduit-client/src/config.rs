//! Client configuration

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Default channel path on the gateway.
pub const DEFAULT_CHANNEL_PATH: &str = "/ws";

/// How long an attempt may stay unopened before it is closed.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(4);

/// Fixed delay before reconnecting after a close.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// Page origin, e.g. `https://app.example.com`
    pub origin: Url,
    /// Channel path appended to the origin
    pub path: String,
    /// Locally cached credential, used in token mode
    pub token: Option<String>,
    /// Cookie header sent in cookie mode (browsers send this implicitly)
    pub cookie: Option<String>,
    /// Start in cookie mode instead of token mode
    pub prefer_cookie: bool,
    pub open_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given page origin
    pub fn new(origin: &str) -> Result<Self, ClientError> {
        let origin = Url::parse(origin).map_err(|e| ClientError::InvalidOrigin(e.to_string()))?;

        Ok(Self {
            origin,
            path: DEFAULT_CHANNEL_PATH.to_string(),
            token: None,
            cookie: None,
            prefer_cookie: true,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        })
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the cached token. Empty tokens count as absent.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    #[must_use]
    pub fn prefer_cookie(mut self, prefer: bool) -> Self {
        self.prefer_cookie = prefer;
        self
    }

    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Channel endpoint derived from the origin: `http` becomes `ws`,
    /// `https` becomes `wss`.
    pub fn endpoint(&self) -> Result<Url, ClientError> {
        let scheme = match self.origin.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ClientError::InvalidOrigin(format!(
                    "unsupported scheme: {other}"
                )))
            }
        };

        let mut endpoint = self.origin.clone();
        endpoint
            .set_scheme(scheme)
            .map_err(|()| ClientError::InvalidOrigin(self.origin.to_string()))?;
        endpoint.set_path(&self.path);
        endpoint.set_query(None);
        endpoint.set_fragment(None);
        Ok(endpoint)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("origin", &self.origin.as_str())
            .field("path", &self.path)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("cookie", &self.cookie.as_ref().map(|_| "[REDACTED]"))
            .field("prefer_cookie", &self.prefer_cookie)
            .field("open_timeout", &self.open_timeout)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost:3001").unwrap();
        assert_eq!(config.path, "/ws");
        assert!(config.prefer_cookie);
        assert_eq!(config.open_timeout, Duration::from_secs(4));
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_endpoint_upgrades_scheme() {
        let plain = ClientConfig::new("http://localhost:3001/dashboard?tab=1").unwrap();
        assert_eq!(plain.endpoint().unwrap().as_str(), "ws://localhost:3001/ws");

        let secure = ClientConfig::new("https://app.example.com").unwrap();
        assert_eq!(secure.endpoint().unwrap().as_str(), "wss://app.example.com/ws");
    }

    #[test]
    fn test_endpoint_rejects_other_schemes() {
        let config = ClientConfig::new("file:///tmp/index.html").unwrap();
        assert!(matches!(
            config.endpoint(),
            Err(ClientError::InvalidOrigin(_))
        ));
    }

    #[test]
    fn test_empty_token_is_absent() {
        let config = ClientConfig::new("http://localhost")
            .unwrap()
            .with_token(Some(String::new()));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::new("http://localhost")
            .unwrap()
            .with_token(Some("eyJsecret".into()))
            .with_cookie("auth_token=eyJsecret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("eyJsecret"));
    }
}
