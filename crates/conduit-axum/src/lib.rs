//! Conduit Axum Integration
//!
//! Axum middleware and extractors that put the conduit access guard in
//! front of HTTP routes and duplex-channel upgrades.
//!
//! # Overview
//!
//! - **Middleware**: [`GuardLayer`] runs the optional API-key gate, then the
//!   access guard, and stores the admitted [`AuthContext`] in request
//!   extensions. Rejections become JSON error responses.
//! - **Extractors**: [`RequireIdentity`], [`MaybeIdentity`]
//!
//! # Quick Start
//!
//! ```ignore
//! use conduit_axum::{GuardConfig, GuardLayer, RequireIdentity};
//! use axum::{Router, routing::get};
//!
//! async fn me(auth: RequireIdentity) -> String {
//!     format!("Hello, {}!", auth.username())
//! }
//!
//! let api = Router::new()
//!     .route("/api/me", get(me))
//!     .layer(GuardLayer::new(guard.clone()));
//!
//! // Browsers cannot set headers on a websocket open, so the channel
//! // route skips the API-key gate.
//! let ws = Router::new()
//!     .route("/ws", get(ws_handler))
//!     .layer(GuardLayer::with_config(guard, GuardConfig::channel()));
//! ```

pub mod context;
pub mod error;
pub mod extractors;
pub mod layer;

// Re-export primary types
pub use context::AuthContext;
pub use error::AuthRejection;
pub use extractors::{MaybeIdentity, RequireIdentity};
pub use layer::{GuardConfig, GuardLayer, GuardService, API_KEY_HEADER};
