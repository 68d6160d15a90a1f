//! Conduit Client - reconnecting duplex session
//!
//! Keeps one realtime channel to a conduit gateway alive for the lifetime
//! of a UI session:
//! - open timeout guard on every attempt
//! - one cookie-auth fallback when a token attempt never opens
//! - fixed-delay reconnect forever after that
//!
//! The transition rules live in [`session`] as a plain state machine; the
//! [`DuplexClient`] driver executes its commands on a tokio task against an
//! injectable [`Connector`].

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use client::DuplexClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{AuthMode, Command, Event, Phase, SessionState};
pub use transport::{ChannelIo, Connector, WsConnector};
