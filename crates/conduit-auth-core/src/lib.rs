//! Conduit Auth Core - Authentication business logic
//!
//! Transport-agnostic pieces shared by HTTP requests and duplex channels:
//! credential signing/verification, multi-source credential lookup, and
//! the access guard that turns candidates into an admitted identity.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod guard;
pub mod locator;
pub mod store;

pub use codec::{CredentialCodec, TokenClaims, Verification};
pub use config::{AuthConfig, ConfigError, INSECURE_DEV_SECRET};
pub use crypto::constant_time_str_eq;
pub use error::AuthError;
pub use guard::{AccessGuard, Admission, AdmittedVia};
pub use locator::{Candidate, CredentialLocator, CredentialSource, AUTH_COOKIE, TOKEN_QUERY_PARAM};
pub use store::{MemoryUserStore, StoreError, StoreResult, UserStore};
