//! Axum extractors for the admitted identity.
//!
//! These read the [`AuthContext`] the guard layer stored in request
//! extensions.
//!
//! # Usage
//!
//! ```ignore
//! use conduit_axum::{MaybeIdentity, RequireIdentity};
//!
//! // 401 if the guard layer did not admit the request
//! async fn protected(auth: RequireIdentity) -> String {
//!     format!("Hello, {}!", auth.username())
//! }
//!
//! async fn greeting(auth: MaybeIdentity) -> String {
//!     match auth.0 {
//!         Some(ctx) => format!("Hello, {}!", ctx.username()),
//!         None => "Hello, guest!".to_string(),
//!     }
//! }
//! ```

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::context::AuthContext;
use crate::error::AuthRejection;

/// Extractor that requires an admitted identity.
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub AuthContext);

impl Deref for RequireIdentity {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Self)
            .ok_or(AuthRejection::MissingContext)
    }
}

/// Extractor for an optional identity.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<AuthContext>);

impl Deref for MaybeIdentity {
    type Target = Option<AuthContext>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthContext>().cloned()))
    }
}
