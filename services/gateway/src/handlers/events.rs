//! Event publishing

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use conduit_axum::RequireIdentity;
use serde::Serialize;
use serde_json::Value;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub delivered: usize,
}

/// POST /api/events - fan a JSON event out to every open channel
pub async fn publish_event(
    State(state): State<AppState>,
    RequireIdentity(ctx): RequireIdentity,
    Json(event): Json<Value>,
) -> (StatusCode, Json<PublishResponse>) {
    let delivered = state.publish(event);
    tracing::debug!(user_id = %ctx.user_id(), delivered, "Event published");

    (StatusCode::ACCEPTED, Json(PublishResponse { delivered }))
}
