//! HTTP handlers

mod events;
mod health;
mod me;
mod ws;

pub use events::publish_event;
pub use health::health;
pub use me::me;
pub use ws::channel;
