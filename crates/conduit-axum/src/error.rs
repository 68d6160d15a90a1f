//! Rejection type for guard middleware and extractors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use conduit_auth_core::AuthError;
use serde::Serialize;

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Why a request never reached its handler.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    /// The access guard refused the request.
    #[error(transparent)]
    Guard(#[from] AuthError),

    /// An identity extractor ran on a route without the guard layer.
    #[error("authentication required")]
    MissingContext,
}

impl AuthRejection {
    /// HTTP status for this rejection.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Guard(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::MissingContext => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Guard(err) => err.error_code(),
            Self::MissingContext => "NO_CREDENTIAL",
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Store and internal failures keep their details in the logs
            Self::Guard(AuthError::Store(_) | AuthError::Internal(_)) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Auth rejected with server fault");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Auth rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AuthRejection::from(AuthError::NoCredential).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::from(AuthError::InvalidCredential).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthRejection::from(AuthError::Unconfigured).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AuthRejection::MissingContext.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_store_details_not_exposed() {
        let rejection = AuthRejection::from(AuthError::Store("db at 10.0.0.3 down".into()));
        assert_eq!(rejection.public_message(), "internal error");

        let rejection = AuthRejection::from(AuthError::Unconfigured);
        assert_eq!(
            rejection.public_message(),
            "Platform mode: No user found in database"
        );
    }
}
