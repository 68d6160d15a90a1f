//! Realtime event channel
//!
//! The upgrade request has already been admitted by the guard layer by the
//! time this handler runs; a refused upgrade never gets here.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use conduit_axum::{AuthContext, RequireIdentity};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

/// GET /ws - upgrade to the event channel
pub async fn channel(
    State(state): State<AppState>,
    RequireIdentity(ctx): RequireIdentity,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| session(socket, state, ctx))
}

async fn session(socket: WebSocket, state: AppState, ctx: AuthContext) {
    let user_id = ctx.user_id();
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.subscribe();

    tracing::info!(%user_id, "Channel opened");

    let connected = json!({ "type": "connected", "user": ctx.identity });
    if sender.send(text(&connected)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if sender.send(text(&event)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%user_id, skipped, "Channel lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(body))) => {
                    if sender.send(text(&reply(body.as_str()))).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%user_id, error = %e, "Channel read failed");
                    break;
                }
            },
        }
    }

    tracing::info!(%user_id, "Channel closed");
}

/// Answer one inbound frame.
fn reply(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(payload) => json!({ "type": "ack", "payload": payload }),
        Err(_) => json!({ "type": "error", "code": "MALFORMED_MESSAGE" }),
    }
}

fn text(value: &Value) -> Message {
    Message::Text(value.to_string().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_acks_json() {
        assert_eq!(
            reply(r#"{"cmd":"ping"}"#),
            json!({ "type": "ack", "payload": { "cmd": "ping" } })
        );
    }

    #[test]
    fn test_reply_flags_malformed() {
        assert_eq!(
            reply("ping"),
            json!({ "type": "error", "code": "MALFORMED_MESSAGE" })
        );
    }
}
