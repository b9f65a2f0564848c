//! Request middleware: authentication gate, per-identity rate limiting and
//! request logging
//!
//! The gate runs before any other work for a protected route. An
//! unauthenticated caller is answered with 401 before the rate limiter is
//! consulted and before a request body (multipart uploads included) is
//! read.

use std::time::Instant;

use axum::Extension;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use common::IdentityKey;
use tracing::{debug, error, info, warn};

use crate::error::GatewayError;
use crate::session;
use crate::state::AppState;

/// Admit the request only if its session holds stored credentials; the
/// resolved identity is attached to the request for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let identity = session::identity_from(&jar, &state.session)
        .filter(|identity| state.store.has(identity))
        .ok_or_else(|| {
            debug!(path = %request.uri().path(), "rejecting unauthenticated request");
            GatewayError::NotAuthenticated("User not authenticated".into())
        })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Per-identity admission control. Must run inside `require_auth`.
pub async fn rate_limit(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if !state.limiter.admit(&identity) {
        debug!(
            identity = %identity,
            path = %request.uri().path(),
            window_secs = state.limiter.window().as_secs(),
            "request refused by rate limiter"
        );
        return Err(GatewayError::RateLimited);
    }
    Ok(next.run(request).await)
}

/// Log every completed request and record it in Prometheus. The query
/// string is never logged: the OAuth callback carries the one-time code
/// there.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = start.elapsed();
    crate::metrics::record_request(status.as_u16(), method.as_str(), elapsed.as_secs_f64());

    let latency_ms = elapsed.as_millis() as u64;
    if status.is_server_error() {
        error!(%method, %path, status = status.as_u16(), latency_ms, "request failed");
    } else if status.is_client_error() {
        warn!(%method, %path, status = status.as_u16(), latency_ms, "request rejected");
    } else {
        info!(%method, %path, status = status.as_u16(), latency_ms, "request completed");
    }
    response
}
