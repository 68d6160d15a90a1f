//! Application state

use std::sync::Arc;

use conduit_auth_core::{AccessGuard, MemoryUserStore};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::Config;

/// Events buffered per channel before a slow reader starts lagging
const EVENT_BUFFER: usize = 256;

pub type Guard = AccessGuard<MemoryUserStore>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Access guard over the in-memory user store
    pub guard: Arc<Guard>,
    /// Fan-out of published events to every open channel
    events: broadcast::Sender<Value>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state, seeding the user store from config
    pub fn new(config: Config) -> Self {
        let users = Arc::new(MemoryUserStore::with_users(config.seed_users.clone()));
        let guard = AccessGuard::new(config.auth.clone(), users);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Self {
            guard: Arc::new(guard),
            events,
            config: Arc::new(config),
        }
    }

    /// Publish an event; returns how many channels it reached.
    pub fn publish(&self, event: Value) -> usize {
        // No subscribers is not an error
        self.events.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.events.subscribe()
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}
