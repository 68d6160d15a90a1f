//! Channel transport
//!
//! [`Connector`] is the seam between the session driver and the network.
//! An opened channel is a pair of text queues. Dropping both ends releases
//! the socket, and the inbound receiver ending means the peer went away.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::ClientError;
use crate::session::AuthMode;

/// Query parameter carrying the token in token mode.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Text queues of an opened channel.
#[derive(Debug)]
pub struct ChannelIo {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

/// Opens duplex channels.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a channel to `endpoint`, resolving once it is open.
    async fn open(&self, endpoint: &Url, auth: &AuthMode) -> Result<ChannelIo, ClientError>;
}

/// WebSocket connector over `tokio-tungstenite`.
#[derive(Clone, Default)]
pub struct WsConnector {
    cookie: Option<String>,
}

impl WsConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cookie header sent on cookie-mode opens.
    #[must_use]
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }

    /// URL for an open attempt; token mode carries the token in the query.
    #[must_use]
    pub fn attempt_url(endpoint: &Url, auth: &AuthMode) -> Url {
        let mut url = endpoint.clone();
        if let AuthMode::Token(token) = auth {
            url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, token);
        }
        url
    }
}

impl std::fmt::Debug for WsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnector")
            .field("has_cookie", &self.cookie.is_some())
            .finish()
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, endpoint: &Url, auth: &AuthMode) -> Result<ChannelIo, ClientError> {
        let url = Self::attempt_url(endpoint, auth);
        let mut req = url
            .as_str()
            .into_client_request()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        if let (AuthMode::Cookie, Some(cookie)) = (auth, self.cookie.as_deref()) {
            let value = HeaderValue::from_str(cookie).map_err(|_| ClientError::InvalidCookie)?;
            req.headers_mut().insert("cookie", value);
        }

        let (stream, _resp) = tokio_tungstenite::connect_async(req)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    tracing::debug!(error = %e, "Channel write failed");
                    return;
                }
            }
            // Outbound sender dropped: close our side
            let _ = sink.close().await;
        });

        // Stops when the peer closes or the inbound receiver is dropped, so
        // a silent peer cannot hold the socket after teardown
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    () = inbound_tx.closed() => break,
                    frame = source.next() => frame,
                };
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if inbound_tx.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Channel error");
                        break;
                    }
                }
            }
            tracing::debug!("Channel reader stopped");
        });

        Ok(ChannelIo {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
