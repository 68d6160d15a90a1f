//! Conduit Gateway
//!
//! Guarded HTTP API plus a realtime event channel.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness probe (unauthenticated)
//! - `GET /api/me` - Identity admitted by the guard
//! - `POST /api/events` - Publish a JSON event to every open channel
//! - `GET /ws` - Event channel upgrade (cookie, bearer or `?token=`)

mod config;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use conduit_axum::{GuardConfig, GuardLayer};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("gateway=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Conduit Gateway");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        mode = %config.auth.mode,
        api_key = config.auth.api_key.is_some(),
        users = config.seed_users.len(),
        "Configuration loaded"
    );

    if config.auth.mode.is_platform() && config.seed_users.is_empty() {
        tracing::warn!("Platform mode with no users: every request will fail");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(config);
    let app = build_router(state);

    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout();

    // Guarded API routes, API-key gate included
    let api = Router::new()
        .route("/api/me", get(handlers::me))
        .route("/api/events", post(handlers::publish_event))
        .layer(GuardLayer::new(Arc::clone(&state.guard)))
        .layer(TimeoutLayer::new(request_timeout));

    // Channel upgrades cannot carry custom headers, so no API-key gate
    let channel = Router::new().route("/ws", get(handlers::channel)).layer(
        GuardLayer::with_config(Arc::clone(&state.guard), GuardConfig::channel()),
    );

    let health_routes = Router::new().route("/health", get(handlers::health));

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        .merge(api)
        .merge(channel)
        .merge(health_routes)
        .layer(middleware)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use conduit_types::Identity;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn app_with(vars: &[(&str, &str)]) -> (Router, AppState) {
        let mut vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        vars.entry("GATEWAY_USERS".into())
            .or_insert_with(|| "1:alice,2:bob".into());

        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let state = AppState::new(config);
        (build_router(state.clone()), state)
    }

    fn bearer(state: &AppState, id: i64, name: &str) -> String {
        let token = state.guard.issue(&Identity::new(id, name)).unwrap();
        format!("Bearer {token}")
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _) = app_with(&[("API_KEY", "k")]);
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = call(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "standalone");
    }

    #[tokio::test]
    async fn test_me_returns_store_identity() {
        let (app, state) = app_with(&[]);
        let req = Request::get("/api/me")
            .header(header::AUTHORIZATION, bearer(&state, 2, "bob"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"], json!({"id": 2, "username": "bob"}));
    }

    #[tokio::test]
    async fn test_me_requires_credential() {
        let (app, _) = app_with(&[]);
        let req = Request::get("/api/me").body(Body::empty()).unwrap();
        let (status, body) = call(app, req).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "NO_CREDENTIAL");
    }

    #[tokio::test]
    async fn test_platform_mode_needs_no_credential() {
        let (app, _) = app_with(&[("IS_PLATFORM", "true")]);
        let req = Request::get("/api/me").body(Body::empty()).unwrap();
        let (status, body) = call(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let (app, state) = app_with(&[]);
        let mut events = state.subscribe();

        let req = Request::post("/api/events")
            .header(header::AUTHORIZATION, bearer(&state, 1, "alice"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"type":"build","status":"done"}"#))
            .unwrap();
        let (status, body) = call(app, req).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["delivered"], 1);
        assert_eq!(
            events.recv().await.unwrap(),
            json!({"type": "build", "status": "done"})
        );
    }

    #[tokio::test]
    async fn test_api_key_guards_api_routes() {
        let (app, state) = app_with(&[("API_KEY", "k-123")]);
        let req = Request::get("/api/me")
            .header(header::AUTHORIZATION, bearer(&state, 1, "alice"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app, req).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_API_KEY");
    }

    #[tokio::test]
    async fn test_channel_refuses_bad_credentials() {
        let (app, _) = app_with(&[]);

        let req = Request::get("/ws").body(Body::empty()).unwrap();
        let (status, _) = call(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::get("/ws?token=garbage").body(Body::empty()).unwrap();
        let (status, _) = call(app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_channel_skips_api_key_gate() {
        let (app, state) = app_with(&[("API_KEY", "k-123")]);
        let token = state.guard.issue(&Identity::new(1, "alice")).unwrap();

        // Admitted by the guard; a plain GET then fails the upgrade itself
        let req = Request::get(format!("/ws?token={token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(app, req).await;

        assert_ne!(status, StatusCode::UNAUTHORIZED);
        assert_ne!(status, StatusCode::FORBIDDEN);
        assert!(status.is_client_error());
    }
}
