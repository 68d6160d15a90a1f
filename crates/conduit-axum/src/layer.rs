//! Tower middleware layer for the access guard.
//!
//! The [`GuardLayer`] runs the API-key gate and the access guard ahead of
//! the wrapped service. Admitted requests carry an [`AuthContext`] in their
//! extensions; refused requests are answered with an [`AuthRejection`] and
//! never reach the inner service.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use conduit_auth_core::{AccessGuard, UserStore};
use futures_util::future::BoxFuture;
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::context::AuthContext;
use crate::error::AuthRejection;

/// Default header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Configuration for the guard middleware layer.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Whether to enforce the API-key gate before the guard runs.
    pub check_api_key: bool,
    /// Header name for the API key (default: x-api-key).
    pub api_key_header: String,
    /// Admit as a duplex-channel open: located tokens are handed to
    /// [`AccessGuard::admit_channel`] as handshake credentials.
    pub channel_open: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            check_api_key: true,
            api_key_header: API_KEY_HEADER.to_string(),
            channel_open: false,
        }
    }
}

impl GuardConfig {
    /// Create a new config builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for duplex-channel upgrades, which cannot carry custom headers.
    #[must_use]
    pub fn channel() -> Self {
        Self::default().check_api_key(false).channel_open(true)
    }

    /// Set whether requests are admitted as duplex-channel opens.
    #[must_use]
    pub fn channel_open(mut self, channel_open: bool) -> Self {
        self.channel_open = channel_open;
        self
    }

    /// Set whether to enforce the API-key gate.
    #[must_use]
    pub fn check_api_key(mut self, check: bool) -> Self {
        self.check_api_key = check;
        self
    }

    /// Set the API key header name.
    #[must_use]
    pub fn api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }
}

/// Tower layer that admits requests through an [`AccessGuard`].
pub struct GuardLayer<U: UserStore> {
    guard: Arc<AccessGuard<U>>,
    config: GuardConfig,
}

impl<U: UserStore> GuardLayer<U> {
    /// Create a guard layer with the default configuration.
    #[must_use]
    pub fn new(guard: Arc<AccessGuard<U>>) -> Self {
        Self {
            guard,
            config: GuardConfig::default(),
        }
    }

    /// Create a guard layer with custom configuration.
    #[must_use]
    pub fn with_config(guard: Arc<AccessGuard<U>>, config: GuardConfig) -> Self {
        Self { guard, config }
    }
}

impl<U: UserStore> Clone for GuardLayer<U> {
    fn clone(&self) -> Self {
        Self {
            guard: Arc::clone(&self.guard),
            config: self.config.clone(),
        }
    }
}

impl<U: UserStore> fmt::Debug for GuardLayer<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardLayer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, U: UserStore> Layer<S> for GuardLayer<U> {
    type Service = GuardService<S, U>;

    fn layer(&self, inner: S) -> Self::Service {
        GuardService {
            inner,
            guard: Arc::clone(&self.guard),
            config: self.config.clone(),
        }
    }
}

/// The guard authentication service.
pub struct GuardService<S, U: UserStore> {
    inner: S,
    guard: Arc<AccessGuard<U>>,
    config: GuardConfig,
}

impl<S: Clone, U: UserStore> Clone for GuardService<S, U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            guard: Arc::clone(&self.guard),
            config: self.config.clone(),
        }
    }
}

/// Run the API-key gate, then the guard, and attach the admitted context.
async fn admit<U: UserStore>(
    guard: Arc<AccessGuard<U>>,
    config: GuardConfig,
    mut req: Request<Body>,
) -> Result<Request<Body>, AuthRejection> {
    if config.check_api_key {
        let presented = req
            .headers()
            .get(config.api_key_header.as_str())
            .and_then(|v| v.to_str().ok());
        guard.check_api_key(presented)?;
    }

    let admission = if config.channel_open {
        let tokens = guard
            .locator()
            .locate(req.headers(), req.uri().query())
            .into_iter()
            .map(|candidate| Some(candidate.token));
        guard.admit_channel(tokens).await?
    } else {
        guard
            .admit_request(req.headers(), req.uri().query())
            .await?
    };

    tracing::debug!(
        user_id = %admission.identity.id,
        via = ?admission.via,
        path = %req.uri().path(),
        "Request admitted"
    );

    req.extensions_mut().insert(AuthContext::from(admission));
    Ok(req)
}

impl<S, U> Service<Request<Body>> for GuardService<S, U>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    U: UserStore + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = GuardFuture<S>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Keep the service that was polled ready; leave a fresh clone behind
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let admission = Box::pin(admit(Arc::clone(&self.guard), self.config.clone(), req));

        GuardFuture {
            state: FutureState::Admitting {
                admission,
                inner: Some(inner),
            },
        }
    }
}

pin_project! {
    /// Future for the guard service.
    pub struct GuardFuture<S>
    where
        S: Service<Request<Body>>,
    {
        #[pin]
        state: FutureState<S>,
    }
}

pin_project! {
    #[project = FutureStateProj]
    enum FutureState<S>
    where
        S: Service<Request<Body>>,
    {
        Admitting {
            admission: BoxFuture<'static, Result<Request<Body>, AuthRejection>>,
            inner: Option<S>,
        },
        Calling {
            #[pin]
            future: S::Future,
        },
        Done,
    }
}

impl<S> Future for GuardFuture<S>
where
    S: Service<Request<Body>, Response = Response>,
{
    type Output = Result<S::Response, S::Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            let this = self.as_mut().project();

            match this.state.project() {
                FutureStateProj::Admitting { admission, inner } => {
                    let outcome = match admission.as_mut().poll(cx) {
                        Poll::Ready(outcome) => outcome,
                        Poll::Pending => return Poll::Pending,
                    };

                    match outcome {
                        Ok(request) => {
                            let Some(mut service) = inner.take() else {
                                panic!("inner service taken twice");
                            };
                            let future = service.call(request);
                            self.set(GuardFuture {
                                state: FutureState::Calling { future },
                            });
                        }
                        Err(rejection) => {
                            self.set(GuardFuture {
                                state: FutureState::Done,
                            });
                            return Poll::Ready(Ok(rejection.into_response()));
                        }
                    }
                }
                FutureStateProj::Calling { future } => {
                    return future.poll(cx);
                }
                FutureStateProj::Done => {
                    panic!("polled after completion");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = GuardConfig::new()
            .check_api_key(false)
            .api_key_header("x-custom-key");

        assert!(!config.check_api_key);
        assert_eq!(config.api_key_header, "x-custom-key");
    }

    #[test]
    fn test_channel_preset_skips_api_key() {
        assert!(GuardConfig::default().check_api_key);
        assert!(!GuardConfig::default().channel_open);
        assert!(!GuardConfig::channel().check_api_key);
        assert!(GuardConfig::channel().channel_open);
        assert_eq!(GuardConfig::channel().api_key_header, API_KEY_HEADER);
    }
}
