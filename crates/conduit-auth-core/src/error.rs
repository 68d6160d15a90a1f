//! Auth errors

use thiserror::Error;

use crate::store::StoreError;

/// Reasons an operation is refused by the auth layer.
///
/// Every variant is terminal for the operation that produced it; nothing
/// here is retried server-side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// API key gate configured and the presented key did not match
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Platform mode with no user in the store
    #[error("Platform mode: No user found in database")]
    Unconfigured,

    /// No candidate credential in any location
    #[error("Access denied. No token provided.")]
    NoCredential,

    /// Candidates were presented but none verified
    #[error("Invalid token")]
    InvalidCredential,

    /// Credential verified but its user is gone from the store
    #[error("Invalid token. User not found.")]
    UnknownUser,

    /// User store failed to answer
    #[error("user store error: {0}")]
    Store(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidApiKey | Self::NoCredential | Self::UnknownUser => 401,
            Self::InvalidCredential => 403,
            Self::Unconfigured | Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::Unconfigured => "UNCONFIGURED",
            Self::NoCredential => "NO_CREDENTIAL",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::UnknownUser => "UNKNOWN_USER",
            Self::Store(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Server-side misconfiguration or failure, as opposed to a caller problem
    pub fn is_server_fault(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        tracing::error!("User store error: {}", err);
        Self::Store(err.to_string())
    }
}
