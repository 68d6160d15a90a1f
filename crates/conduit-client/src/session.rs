//! Duplex session state machine
//!
//! All connection policy lives here, free of I/O: the driver feeds
//! [`Event`]s in and executes the [`Command`]s that come back. Events from
//! an attempt other than the current one are ignored, so late callbacks
//! from a closed channel can never disturb its successor.

use std::fmt;

use serde_json::Value;

/// Connection phase as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No attempt made yet
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// How an attempt authenticates its channel open.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Ambient cookie, authoritative on the server
    Cookie,
    /// Locally cached token passed at open time
    Token(String),
}

impl AuthMode {
    #[must_use]
    pub fn is_cookie(&self) -> bool {
        matches!(self, Self::Cookie)
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cookie => f.write_str("Cookie"),
            Self::Token(_) => f.write_str("Token([REDACTED])"),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start an attempt if none is live
    Connect,
    Opened { attempt: u64 },
    Message { attempt: u64, text: String },
    Closed { attempt: u64 },
    OpenTimeout { attempt: u64 },
    ReconnectDue,
    Send(Value),
    Shutdown,
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { attempt: u64, auth: AuthMode },
    ArmOpenTimeout { attempt: u64 },
    DisarmOpenTimeout,
    /// Drop the live channel (or pending open) if any
    CloseChannel,
    ScheduleReconnect,
    CancelReconnect,
    Transmit(String),
    Deliver(Value),
}

/// Session state carried across attempts.
#[derive(Clone)]
pub struct SessionState {
    phase: Phase,
    attempt: u64,
    used_cookie_auth: bool,
    opened: bool,
    fallback_attempted: bool,
    prefer_cookie: bool,
    token: Option<String>,
    reconnect_pending: bool,
    shut_down: bool,
}

impl SessionState {
    /// Create an idle session.
    ///
    /// Token mode is only attempted when `prefer_cookie` is off and a token
    /// is cached.
    #[must_use]
    pub fn new(token: Option<String>, prefer_cookie: bool) -> Self {
        Self {
            phase: Phase::Idle,
            attempt: 0,
            used_cookie_auth: false,
            opened: false,
            fallback_attempted: false,
            prefer_cookie,
            token: token.filter(|t| !t.is_empty()),
            reconnect_pending: false,
            shut_down: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of the current (latest) attempt; zero before the first.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn used_cookie_auth(&self) -> bool {
        self.used_cookie_auth
    }

    pub fn fallback_attempted(&self) -> bool {
        self.fallback_attempted
    }

    pub fn prefers_cookie(&self) -> bool {
        self.prefer_cookie
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Whether `attempt` is the live attempt and still waiting to open.
    pub fn awaiting_open(&self, attempt: u64) -> bool {
        attempt == self.attempt && self.phase == Phase::Connecting
    }

    fn is_live(&self, attempt: u64) -> bool {
        attempt == self.attempt && matches!(self.phase, Phase::Connecting | Phase::Open)
    }

    fn next_auth(&self) -> AuthMode {
        match (&self.token, self.prefer_cookie) {
            (Some(token), false) => AuthMode::Token(token.clone()),
            _ => AuthMode::Cookie,
        }
    }

    /// Apply one event, returning the commands to execute in order.
    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        if self.shut_down {
            return Vec::new();
        }

        match event {
            Event::Connect => self.connect(),
            Event::Opened { attempt } => self.on_open(attempt),
            Event::Message { attempt, text } => self.on_message(attempt, &text),
            Event::Closed { attempt } => {
                if !self.is_live(attempt) {
                    return Vec::new();
                }
                self.on_close()
            }
            Event::OpenTimeout { attempt } => {
                if !self.awaiting_open(attempt) || self.opened {
                    return Vec::new();
                }
                tracing::debug!(attempt, "Channel did not open in time, closing");
                self.on_close()
            }
            Event::ReconnectDue => {
                if !self.reconnect_pending {
                    return Vec::new();
                }
                self.reconnect_pending = false;
                self.connect()
            }
            Event::Send(payload) => self.send(&payload),
            Event::Shutdown => self.shutdown(),
        }
    }

    fn connect(&mut self) -> Vec<Command> {
        if matches!(self.phase, Phase::Connecting | Phase::Open) {
            return Vec::new();
        }

        let mut commands = Vec::with_capacity(3);
        if self.reconnect_pending {
            self.reconnect_pending = false;
            commands.push(Command::CancelReconnect);
        }

        let auth = self.next_auth();
        self.attempt += 1;
        self.opened = false;
        self.used_cookie_auth = auth.is_cookie();
        self.phase = Phase::Connecting;

        tracing::debug!(attempt = self.attempt, auth = ?auth, "Opening duplex channel");

        commands.push(Command::Open {
            attempt: self.attempt,
            auth,
        });
        commands.push(Command::ArmOpenTimeout {
            attempt: self.attempt,
        });
        commands
    }

    fn on_open(&mut self, attempt: u64) -> Vec<Command> {
        if !self.awaiting_open(attempt) {
            return Vec::new();
        }

        self.opened = true;
        self.fallback_attempted = false;
        self.prefer_cookie = self.used_cookie_auth;
        self.phase = Phase::Open;

        tracing::info!(attempt, cookie_auth = self.used_cookie_auth, "Duplex channel open");
        vec![Command::DisarmOpenTimeout]
    }

    fn on_message(&mut self, attempt: u64, text: &str) -> Vec<Command> {
        if attempt != self.attempt || self.phase != Phase::Open {
            return Vec::new();
        }

        match serde_json::from_str::<Value>(text) {
            Ok(value) => vec![Command::Deliver(value)],
            Err(e) => {
                tracing::error!(error = %e, "Dropping malformed channel message");
                Vec::new()
            }
        }
    }

    fn on_close(&mut self) -> Vec<Command> {
        self.phase = Phase::Closed;
        let mut commands = vec![Command::DisarmOpenTimeout, Command::CloseChannel];

        // A token attempt that never opened gets exactly one cookie retry
        if !self.opened && !self.used_cookie_auth && !self.fallback_attempted {
            tracing::info!(attempt = self.attempt, "Token auth failed, retrying with cookie auth");
            self.fallback_attempted = true;
            self.prefer_cookie = true;
            commands.extend(self.connect());
            return commands;
        }

        tracing::debug!(attempt = self.attempt, "Duplex channel closed, scheduling reconnect");
        self.reconnect_pending = true;
        commands.push(Command::ScheduleReconnect);
        commands
    }

    fn send(&self, payload: &Value) -> Vec<Command> {
        if self.phase != Phase::Open {
            tracing::warn!(phase = %self.phase, "Duplex channel not connected, message not sent");
            return Vec::new();
        }

        match serde_json::to_string(payload) {
            Ok(text) => vec![Command::Transmit(text)],
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode outbound message");
                Vec::new()
            }
        }
    }

    fn shutdown(&mut self) -> Vec<Command> {
        self.shut_down = true;
        self.reconnect_pending = false;
        self.phase = Phase::Closed;
        vec![
            Command::CancelReconnect,
            Command::DisarmOpenTimeout,
            Command::CloseChannel,
        ]
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("phase", &self.phase)
            .field("attempt", &self.attempt)
            .field("used_cookie_auth", &self.used_cookie_auth)
            .field("opened", &self.opened)
            .field("fallback_attempted", &self.fallback_attempted)
            .field("prefer_cookie", &self.prefer_cookie)
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}
