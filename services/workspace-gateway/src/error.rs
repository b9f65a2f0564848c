//! HTTP-facing error taxonomy
//!
//! Every failure a handler or middleware can produce maps to exactly one
//! status here, so 401 (sign in again), 403 (grant more scope) and 429
//! (slow down) stay distinct from generic 500s.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    NotAuthenticated(String),

    /// Authorization callback could not be completed
    #[error("{0}")]
    AuthExchangeFailed(String),

    #[error("{0}")]
    InsufficientScope(String),

    /// Refused by the gateway's own per-identity limiter
    #[error("Too Many Requests: Rate limit exceeded.")]
    RateLimited,

    /// Google-side quota exhausted
    #[error("{0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    UpstreamFailure(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The gateway is holding as many pending sign-ins as it will
    #[error("{0}")]
    Unavailable(String),
}

/// Result alias for handlers
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthExchangeFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InsufficientScope(_) => StatusCode::FORBIDDEN,
            GatewayError::RateLimited | GatewayError::QuotaExceeded(_) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GatewayError::UpstreamFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotAuthenticated(_) => "not_authenticated",
            GatewayError::AuthExchangeFailed(_) => "auth_exchange_failed",
            GatewayError::InsufficientScope(_) => "insufficient_scope",
            GatewayError::RateLimited => "rate_limited",
            GatewayError::QuotaExceeded(_) => "quota_exceeded",
            GatewayError::UpstreamFailure(_) => "upstream_error",
            GatewayError::BadRequest(_) => "invalid_request",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Unavailable(_) => "unavailable",
        }
    }
}

/// JSON error body: {"error":{"type":"...","message":"..."}}. A failed
/// authorization callback is shown to a browser tab, so it stays plain text
/// and does not echo the provider's reason.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let GatewayError::AuthExchangeFailed(_) = self {
            return (
                status,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                "Authentication failed",
            )
                .into_response();
        }

        let body = serde_json::json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, [(CONTENT_TYPE, "application/json")], body.to_string()).into_response()
    }
}

impl From<google_api::Error> for GatewayError {
    fn from(err: google_api::Error) -> Self {
        use google_api::Error;
        match err {
            Error::NotAuthenticated(msg) | Error::Unauthorized(msg) => {
                GatewayError::NotAuthenticated(msg)
            }
            Error::InsufficientScope(msg) => GatewayError::InsufficientScope(msg),
            Error::QuotaExceeded(msg) => GatewayError::QuotaExceeded(msg),
            Error::NotFound(msg) => GatewayError::NotFound(msg),
            Error::Upstream { message, .. } => GatewayError::UpstreamFailure(message),
            other @ (Error::Http(_) | Error::InvalidResponse(_) | Error::Config(_)) => {
                GatewayError::UpstreamFailure(other.to_string())
            }
        }
    }
}

impl From<google_auth::Error> for GatewayError {
    fn from(err: google_auth::Error) -> Self {
        match err {
            google_auth::Error::TooManyPending(_) => GatewayError::Unavailable(
                "Too many sign-ins in progress, try again shortly.".into(),
            ),
            other => GatewayError::AuthExchangeFailed(other.to_string()),
        }
    }
}
