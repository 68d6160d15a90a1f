//! Current identity

use axum::Json;
use conduit_axum::RequireIdentity;
use conduit_types::Identity;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Identity,
}

/// GET /api/me - the identity the guard admitted
pub async fn me(RequireIdentity(ctx): RequireIdentity) -> Json<MeResponse> {
    Json(MeResponse { user: ctx.identity })
}
