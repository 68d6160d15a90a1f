//! Configuration types for the auth layer

use conduit_types::OperatingMode;

/// Development-only signing secret used when none is configured.
///
/// Anyone who knows this value can mint credentials. It exists so a fresh
/// checkout runs without setup; never deploy with it.
pub const INSECURE_DEV_SECRET: &str = "conduit-dev-secret-change-in-production";

/// Auth layer configuration, built once at process start.
#[derive(Clone)]
pub struct AuthConfig {
    /// Platform bypass or full credential verification
    pub mode: OperatingMode,
    /// Optional shared key required in `x-api-key` before any auth runs
    pub api_key: Option<String>,
    signing_secret: String,
}

impl AuthConfig {
    /// Recommended minimum length for an explicitly configured secret.
    ///
    /// Shorter secrets are accepted with a warning, since rotating the secret
    /// invalidates every credential already issued.
    pub const MIN_SECRET_LENGTH: usize = 32;

    /// Create a standalone-mode config signing with `signing_secret`
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            mode: OperatingMode::Standalone,
            api_key: None,
            signing_secret: signing_secret.into(),
        }
    }

    /// Create a config from an operator-supplied secret.
    ///
    /// An empty secret is rejected. A short one is accepted and logged.
    pub fn try_new(signing_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let signing_secret = signing_secret.into();
        if signing_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        let config = Self::new(signing_secret);
        if config.has_short_secret() {
            tracing::warn!(
                length = config.signing_secret.len(),
                recommended = Self::MIN_SECRET_LENGTH,
                "Signing secret is shorter than recommended"
            );
        }
        Ok(config)
    }

    /// Create a config using [`INSECURE_DEV_SECRET`]
    pub fn development() -> Self {
        Self::new(INSECURE_DEV_SECRET)
    }

    /// Set operating mode
    pub fn with_mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the API key gate. Empty keys leave the gate disabled.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Secret material for the credential codec
    pub fn signing_secret(&self) -> &str {
        &self.signing_secret
    }

    /// Whether the development secret is in use
    pub fn uses_insecure_default(&self) -> bool {
        self.signing_secret == INSECURE_DEV_SECRET
    }

    /// Whether the secret is below [`Self::MIN_SECRET_LENGTH`]
    pub fn has_short_secret(&self) -> bool {
        self.signing_secret.len() < Self::MIN_SECRET_LENGTH
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode)
            .field("api_key_configured", &self.api_key.is_some())
            .field("insecure_default_secret", &self.uses_insecure_default())
            .field("short_secret", &self.has_short_secret())
            .finish_non_exhaustive()
    }
}

/// Errors building an [`AuthConfig`]
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("signing secret is empty")]
    EmptySecret,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_uses_insecure_default() {
        let config = AuthConfig::development();
        assert!(config.uses_insecure_default());
        assert_eq!(config.mode, OperatingMode::Standalone);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_try_new_accepts_short_secret() {
        let config = AuthConfig::try_new("short").unwrap();
        assert_eq!(config.signing_secret(), "short");
        assert!(config.has_short_secret());

        let config = AuthConfig::try_new("x".repeat(32)).unwrap();
        assert!(!config.has_short_secret());
    }

    #[test]
    fn test_try_new_rejects_empty_secret() {
        assert!(matches!(
            AuthConfig::try_new(""),
            Err(ConfigError::EmptySecret)
        ));
    }

    #[test]
    fn test_empty_api_key_disables_gate() {
        let config = AuthConfig::development().with_api_key(Some(String::new()));
        assert!(config.api_key.is_none());

        let config = AuthConfig::development().with_api_key(Some("k".into()));
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = AuthConfig::new("super-secret-signing-material-0000")
            .with_api_key(Some("api-key-value".into()));
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("api-key-value"));
    }
}
