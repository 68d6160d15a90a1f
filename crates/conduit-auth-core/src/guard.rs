//! Access guard
//!
//! Decides whether an inbound operation (HTTP request or duplex-channel
//! open) is admitted, and with which identity:
//!
//! 1. Platform mode: skip credentials, admit as the store's first user.
//! 2. Locate candidates; none at all is `NoCredential`.
//! 3. Verify candidates in locator order, stopping at the first success.
//!    A stale header token never blocks a valid cookie presented alongside.
//! 4. Re-check the verified user still exists in the store.

use conduit_types::Identity;
use http::HeaderMap;
use std::sync::Arc;

use crate::codec::{CredentialCodec, TokenClaims, Verification};
use crate::crypto::constant_time_str_eq;
use crate::locator::{Candidate, CredentialLocator, CredentialSource};
use crate::store::UserStore;
use crate::{AuthConfig, AuthError};

/// How an operation got admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmittedVia {
    /// Platform mode bypass
    Platform,
    /// A verified credential from the given location
    Credential(CredentialSource),
}

/// A successful admission
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub identity: Identity,
    pub via: AdmittedVia,
}

/// Access guard over a user store
pub struct AccessGuard<U: UserStore> {
    config: AuthConfig,
    codec: CredentialCodec,
    locator: CredentialLocator,
    users: Arc<U>,
}

impl<U: UserStore> AccessGuard<U> {
    /// Create a guard with the default credential locator
    pub fn new(config: AuthConfig, users: Arc<U>) -> Self {
        Self {
            codec: CredentialCodec::from_config(&config),
            locator: CredentialLocator::default(),
            config,
            users,
        }
    }

    pub fn locator(&self) -> &CredentialLocator {
        &self.locator
    }

    /// Optional API key gate, checked before any credential work.
    ///
    /// With no key configured this always passes.
    pub fn check_api_key(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let Some(expected) = self.config.api_key.as_deref() else {
            return Ok(());
        };

        match presented {
            Some(key) if constant_time_str_eq(key, expected) => Ok(()),
            _ => {
                tracing::debug!("API key missing or mismatched");
                Err(AuthError::InvalidApiKey)
            }
        }
    }

    /// Sign a credential for `identity` (login flows)
    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        self.codec.sign(identity)
    }

    /// Admit an HTTP request (or channel upgrade request) from its headers
    /// and raw query string.
    pub async fn admit_request(
        &self,
        headers: &HeaderMap,
        query: Option<&str>,
    ) -> Result<Admission, AuthError> {
        if self.config.mode.is_platform() {
            return self.admit_platform().await;
        }
        let candidates = self.locator.locate(headers, query);
        self.admit_candidates(&candidates).await
    }

    /// Admit a duplex-channel open from the token(s) the client supplied.
    ///
    /// Transports that hand over raw tokens call this directly; the axum
    /// layer reaches it through its channel preset.
    pub async fn admit_channel<I, T>(&self, tokens: I) -> Result<Admission, AuthError>
    where
        I: IntoIterator<Item = Option<T>>,
        T: Into<String>,
    {
        if self.config.mode.is_platform() {
            return self.admit_platform().await;
        }
        let candidates = CredentialLocator::locate_handshake(tokens);
        self.admit_candidates(&candidates).await.inspect_err(|e| {
            tracing::debug!(error = %e, "Duplex channel refused");
        })
    }

    /// Run the full decision over already-located candidates
    pub async fn admit(&self, candidates: &[Candidate]) -> Result<Admission, AuthError> {
        if self.config.mode.is_platform() {
            return self.admit_platform().await;
        }
        self.admit_candidates(candidates).await
    }

    async fn admit_platform(&self) -> Result<Admission, AuthError> {
        let identity = self.users.first_user().await?.ok_or_else(|| {
            tracing::error!("Platform mode: no user found in store");
            AuthError::Unconfigured
        })?;

        Ok(Admission {
            identity,
            via: AdmittedVia::Platform,
        })
    }

    async fn admit_candidates(&self, candidates: &[Candidate]) -> Result<Admission, AuthError> {
        if candidates.is_empty() {
            return Err(AuthError::NoCredential);
        }

        let (claims, source) = self.first_verified(candidates).ok_or_else(|| {
            tracing::error!(
                candidates = candidates.len(),
                "Token verification error: no candidate verified"
            );
            AuthError::InvalidCredential
        })?;

        let identity = self.users.find_by_id(claims.user_id).await?.ok_or_else(|| {
            tracing::warn!(user_id = %claims.user_id, "Credential for unknown user");
            AuthError::UnknownUser
        })?;

        Ok(Admission {
            identity,
            via: AdmittedVia::Credential(source),
        })
    }

    fn first_verified(&self, candidates: &[Candidate]) -> Option<(TokenClaims, CredentialSource)> {
        candidates
            .iter()
            .find_map(|candidate| match self.codec.verify(&candidate.token) {
                Verification::Verified(claims) => Some((claims, candidate.source)),
                Verification::Invalid => {
                    tracing::debug!(source = ?candidate.source, "Candidate credential rejected");
                    None
                }
            })
    }
}

impl<U: UserStore> std::fmt::Debug for AccessGuard<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard")
            .field("config", &self.config)
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}
