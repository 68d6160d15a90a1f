//! Signed bearer credentials
//!
//! Credentials are HS256 JWTs carrying `{userId, username}` and nothing
//! else: no expiry, no issued-at. Signing the same identity with the same
//! secret always yields the same token.

use conduit_types::{Identity, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{AuthConfig, AuthError};

/// Claims bound into a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: UserId,
    pub username: String,
}

impl From<&Identity> for TokenClaims {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.id,
            username: identity.username.clone(),
        }
    }
}

/// Outcome of verifying a credential.
///
/// A malformed token and a well-formed token with a bad signature both
/// come back as `Invalid`; callers cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified(TokenClaims),
    Invalid,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    pub fn claims(self) -> Option<TokenClaims> {
        match self {
            Self::Verified(claims) => Some(claims),
            Self::Invalid => None,
        }
    }
}

/// Signs and verifies credentials with the process-wide secret
#[derive(Clone)]
pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl CredentialCodec {
    /// Create a codec for the given secret
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        let mut validation = Validation::new(Algorithm::HS256);
        // Credentials never expire and carry no registered claims
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Create a codec from auth configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.signing_secret())
    }

    /// Sign a non-expiring credential for `identity`
    pub fn sign(&self, identity: &Identity) -> Result<String, AuthError> {
        let claims = TokenClaims::from(identity);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign credential: {}", e);
            AuthError::Internal("Failed to sign credential".to_string())
        })
    }

    /// Verify a credential. Never fails; bad input is `Verification::Invalid`.
    pub fn verify(&self, token: &str) -> Verification {
        match decode::<TokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Verification::Verified(data.claims),
            Err(e) => {
                tracing::debug!("Credential verification failed: {}", e);
                Verification::Invalid
            }
        }
    }
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}
