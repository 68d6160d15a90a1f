//! Authentication context types.
//!
//! The [`AuthContext`] is what the guard layer attaches to an admitted
//! request and what handlers get back from the extractors.

use conduit_auth_core::{Admission, AdmittedVia, CredentialSource};
use conduit_types::{Identity, UserId};

/// Admitted identity plus how it was admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    /// The user record resolved from the store.
    pub identity: Identity,
    /// Platform bypass or the credential location that verified.
    pub via: AdmittedVia,
}

impl AuthContext {
    /// Create a context for an identity admitted by `via`.
    #[must_use]
    pub fn new(identity: Identity, via: AdmittedVia) -> Self {
        Self { identity, via }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.identity.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.identity.username
    }

    /// Whether the request was admitted by platform-mode bypass.
    #[must_use]
    pub fn is_platform(&self) -> bool {
        matches!(self.via, AdmittedVia::Platform)
    }

    /// Credential location that verified, if any.
    #[must_use]
    pub fn credential_source(&self) -> Option<CredentialSource> {
        match self.via {
            AdmittedVia::Credential(source) => Some(source),
            AdmittedVia::Platform => None,
        }
    }
}

impl From<Admission> for AuthContext {
    fn from(admission: Admission) -> Self {
        Self::new(admission.identity, admission.via)
    }
}
