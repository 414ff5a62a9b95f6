//! Cloudflare Access token gate.
//!
//! `Cf-Access-Jwt-Assertion` を取り出して検証し、通れば内側のサービスへ、
//! 通らなければ 401 を返す。claims は extensions に載せない (pass/reject のみ)。

use std::{
    borrow::Cow,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderName, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::error::AppError;
use crate::services::auth::{AccessClaims, TokenVerifier, VerifyError};
use crate::state::AppState;

/// Header Cloudflare Access injects into proxied requests.
pub const ACCESS_JWT_HEADER: HeaderName = HeaderName::from_static("cf-access-jwt-assertion");

/// Guard every route of `router` with the access gate.
///
/// ```ignore
/// let guarded = Router::new().route("/", any(welcome));
/// let guarded = middleware::auth::access::apply(guarded, &state);
/// ```
pub fn apply<S>(router: Router<S>, state: &AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(AccessGateLayer::new(
        state.verifier.clone(),
        state.verify_timeout,
    ))
}

/// Builds [`AccessGate`] around an inner service.
#[derive(Clone)]
pub struct AccessGateLayer {
    verifier: Arc<dyn TokenVerifier>,
    timeout: Duration,
}

impl AccessGateLayer {
    pub fn new(verifier: Arc<dyn TokenVerifier>, timeout: Duration) -> Self {
        Self { verifier, timeout }
    }
}

impl<S> Layer<S> for AccessGateLayer {
    type Service = AccessGate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessGate {
            inner,
            verifier: self.verifier.clone(),
            timeout: self.timeout,
        }
    }
}

/// Runs the wrapped service only for requests carrying a token the verifier
/// accepts. Rejections are written here and never reach `inner`.
#[derive(Clone)]
pub struct AccessGate<S> {
    inner: S,
    verifier: Arc<dyn TokenVerifier>,
    timeout: Duration,
}

impl<S> Service<Request<Body>> for AccessGate<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // The ready service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let verifier = self.verifier.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let decision = authorize(verifier.as_ref(), timeout, req.headers()).await;
            match decision {
                Ok(claims) => {
                    tracing::debug!(
                        sub = %claims.sub,
                        email = ?claims.email,
                        "access token verified"
                    );
                    inner.call(req).await
                }
                Err(rejection) => Ok(rejection.into_response()),
            }
        })
    }
}

/// Extract the token and verify it, one attempt, bounded by `timeout`.
pub async fn authorize(
    verifier: &dyn TokenVerifier,
    timeout: Duration,
    headers: &HeaderMap,
) -> Result<AccessClaims, AppError> {
    let Some(token) = access_token(headers) else {
        tracing::debug!("request without access token");
        return Err(AppError::MissingToken);
    };

    let verified = tokio::time::timeout(timeout, verifier.verify(&token))
        .await
        .unwrap_or(Err(VerifyError::TimedOut));

    verified.map_err(|err| {
        tracing::warn!(error = %err, "access token verification failed");
        AppError::InvalidToken(err)
    })
}

/// Any non-empty header value is a token candidate; bytes outside visible
/// ASCII are decoded lossily and left for the verifier to reject.
fn access_token(headers: &HeaderMap) -> Option<Cow<'_, str>> {
    let raw = headers.get(&ACCESS_JWT_HEADER)?.as_bytes();
    let token = match String::from_utf8_lossy(raw) {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
    };
    (!token.is_empty()).then_some(token)
}
