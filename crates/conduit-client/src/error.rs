//! Client errors

use thiserror::Error;

/// Client errors for duplex session operations.
///
/// Channel failures never surface here: they feed the reconnect policy and
/// are only logged.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The page origin could not be turned into a channel endpoint.
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),

    /// The configured cookie is not a valid header value.
    #[error("invalid cookie header")]
    InvalidCookie,

    /// Opening the channel failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// An outbound payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The session driver is no longer running.
    #[error("session closed")]
    Closed,
}

impl ClientError {
    /// Returns true if the failure is transient, so a later attempt can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connection_errors_retry() {
        assert!(ClientError::Connection("refused".into()).is_retryable());
        assert!(!ClientError::InvalidOrigin("ftp://x".into()).is_retryable());
        assert!(!ClientError::Closed.is_retryable());
    }
}
