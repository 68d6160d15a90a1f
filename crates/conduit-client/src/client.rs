//! Session driver
//!
//! [`DuplexClient`] owns one tokio task that serialises every input
//! (timer firings, channel frames, caller requests) through a single queue
//! and feeds them to the [`SessionState`]. Timers are spawned sleeps that
//! post back into that queue and are aborted when disarmed.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{AuthMode, Command, Event, Phase, SessionState};
use crate::transport::{ChannelIo, Connector, WsConnector};

enum Input {
    Event(Event),
    Established { attempt: u64, io: ChannelIo },
    Snapshot(oneshot::Sender<Vec<Value>>),
    Drain(oneshot::Sender<Vec<Value>>),
}

/// Handle to a running duplex session.
///
/// Dropping the handle shuts the session down.
#[derive(Debug)]
pub struct DuplexClient {
    inputs: mpsc::UnboundedSender<Input>,
    phase: watch::Receiver<Phase>,
    task: Option<JoinHandle<()>>,
}

impl DuplexClient {
    /// Start a session using the WebSocket connector.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let connector = WsConnector::new().with_cookie(config.cookie.clone());
        Self::spawn(config, connector)
    }

    /// Start a session over `connector` and issue the first connect.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C: Connector>(config: ClientConfig, connector: C) -> Result<Self, ClientError> {
        let endpoint = config.endpoint()?;
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);

        let driver = Driver {
            session: SessionState::new(config.token.clone(), config.prefer_cookie),
            config,
            endpoint,
            connector: Arc::new(connector),
            inputs_tx: inputs_tx.clone(),
            phase_tx,
            inbox: Vec::new(),
            outbound: None,
            reader: None,
            pending_open: None,
            open_timer: None,
            reconnect_timer: None,
        };
        let task = tokio::spawn(driver.run(inputs_rx));

        Ok(Self {
            inputs: inputs_tx,
            phase: phase_rx,
            task: Some(task),
        })
    }

    /// Send a payload if the channel is open; otherwise log and drop it.
    pub fn send<T: Serialize>(&self, payload: &T) -> Result<(), ClientError> {
        let value = serde_json::to_value(payload)?;
        self.inputs
            .send(Input::Event(Event::Send(value)))
            .map_err(|_| ClientError::Closed)
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == Phase::Open
    }

    /// Watch phase changes, e.g. to wait until the channel opens.
    pub fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    /// All messages received so far, oldest first.
    pub async fn messages(&self) -> Result<Vec<Value>, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.inputs
            .send(Input::Snapshot(tx))
            .map_err(|_| ClientError::Closed)?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Remove and return all messages received so far.
    pub async fn take_messages(&self) -> Result<Vec<Value>, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.inputs
            .send(Input::Drain(tx))
            .map_err(|_| ClientError::Closed)?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Stop reconnecting, close the channel and wait for the driver to exit.
    pub async fn shutdown(mut self) {
        let _ = self.inputs.send(Input::Event(Event::Shutdown));
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Session driver ended abnormally");
            }
        }
    }
}

impl Drop for DuplexClient {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.inputs.send(Input::Event(Event::Shutdown));
        }
    }
}

struct Driver<C: Connector> {
    session: SessionState,
    config: ClientConfig,
    endpoint: Url,
    connector: Arc<C>,
    inputs_tx: mpsc::UnboundedSender<Input>,
    phase_tx: watch::Sender<Phase>,
    inbox: Vec<Value>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    reader: Option<JoinHandle<()>>,
    pending_open: Option<JoinHandle<()>>,
    open_timer: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        self.apply(Event::Connect);

        while let Some(input) = inputs.recv().await {
            match input {
                Input::Event(event) => self.apply(event),
                Input::Established { attempt, io } => self.established(attempt, io),
                Input::Snapshot(reply) => {
                    let _ = reply.send(self.inbox.clone());
                }
                Input::Drain(reply) => {
                    let _ = reply.send(std::mem::take(&mut self.inbox));
                }
            }

            if self.session.is_shut_down() {
                break;
            }
        }

        tracing::debug!(attempts = self.session.attempt(), "Session driver stopped");
    }

    fn apply(&mut self, event: Event) {
        for command in self.session.handle(event) {
            self.execute(command);
        }
        self.phase_tx.send_replace(self.session.phase());
    }

    fn established(&mut self, attempt: u64, io: ChannelIo) {
        if !self.session.awaiting_open(attempt) {
            // Superseded while opening; dropping io closes it
            return;
        }

        let ChannelIo { outbound, mut inbound } = io;
        self.outbound = Some(outbound);

        let tx = self.inputs_tx.clone();
        self.reader = Some(tokio::spawn(async move {
            while let Some(text) = inbound.recv().await {
                if tx.send(Input::Event(Event::Message { attempt, text })).is_err() {
                    return;
                }
            }
            let _ = tx.send(Input::Event(Event::Closed { attempt }));
        }));

        self.apply(Event::Opened { attempt });
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Open { attempt, auth } => self.open(attempt, auth),
            Command::ArmOpenTimeout { attempt } => {
                abort(&mut self.open_timer);
                self.open_timer = Some(self.post_after(
                    self.config.open_timeout,
                    Event::OpenTimeout { attempt },
                ));
            }
            Command::DisarmOpenTimeout => abort(&mut self.open_timer),
            Command::CloseChannel => {
                self.outbound = None;
                abort(&mut self.reader);
                abort(&mut self.pending_open);
            }
            Command::ScheduleReconnect => {
                abort(&mut self.reconnect_timer);
                self.reconnect_timer =
                    Some(self.post_after(self.config.reconnect_delay, Event::ReconnectDue));
            }
            Command::CancelReconnect => abort(&mut self.reconnect_timer),
            Command::Transmit(text) => {
                let sent = self
                    .outbound
                    .as_ref()
                    .is_some_and(|outbound| outbound.send(text).is_ok());
                if !sent {
                    tracing::warn!("Duplex channel gone, message not sent");
                }
            }
            Command::Deliver(value) => self.inbox.push(value),
        }
    }

    fn open(&mut self, attempt: u64, auth: AuthMode) {
        let connector = Arc::clone(&self.connector);
        let endpoint = self.endpoint.clone();
        let tx = self.inputs_tx.clone();

        abort(&mut self.pending_open);
        self.pending_open = Some(tokio::spawn(async move {
            let input = match connector.open(&endpoint, &auth).await {
                Ok(io) => Input::Established { attempt, io },
                Err(e) if e.is_retryable() => {
                    tracing::warn!(attempt, error = %e, "Duplex channel open failed");
                    Input::Event(Event::Closed { attempt })
                }
                Err(e) => {
                    // Retrying cannot fix this one, but the session still
                    // follows its reconnect schedule
                    tracing::error!(attempt, error = %e, "Duplex channel open misconfigured");
                    Input::Event(Event::Closed { attempt })
                }
            };
            let _ = tx.send(input);
        }));
    }

    fn post_after(&self, delay: std::time::Duration, event: Event) -> JoinHandle<()> {
        let tx = self.inputs_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Input::Event(event));
        })
    }
}

impl<C: Connector> Drop for Driver<C> {
    fn drop(&mut self) {
        abort(&mut self.reader);
        abort(&mut self.pending_open);
        abort(&mut self.open_timer);
        abort(&mut self.reconnect_timer);
    }
}

fn abort(handle: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = handle.take() {
        handle.abort();
    }
}
