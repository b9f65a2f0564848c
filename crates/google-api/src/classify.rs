//! Classification of Google API error responses
//!
//! Google reports both "missing scope" and "quota exhausted" as 403, so the
//! status alone is not enough. The `reason` strings in the error body decide:
//! quota reasons map to `QuotaExceeded`, everything else on 403 is treated as
//! a permission problem the user can fix by granting more scope.

use crate::error::Error;

/// Reason markers Google uses for quota and rate-limit 403/429 responses.
const QUOTA_PATTERNS: &[&str] = &[
    "quotaexceeded",
    "ratelimitexceeded",
    "userratelimitexceeded",
    "dailylimitexceeded",
    "resource_exhausted",
];

/// What the gateway should tell the browser about an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// Access token rejected; the user must sign in again
    Unauthorized,
    /// Token valid but lacks a scope; the user must re-consent with more
    InsufficientScope,
    /// Google-side quota exhausted; try later
    QuotaExceeded,
    NotFound,
    /// Anything else, relayed as a generic upstream failure
    Upstream,
}

impl ErrorClassification {
    /// Label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClassification::Unauthorized => "unauthorized",
            ErrorClassification::InsufficientScope => "insufficient_scope",
            ErrorClassification::QuotaExceeded => "quota_exceeded",
            ErrorClassification::NotFound => "not_found",
            ErrorClassification::Upstream => "upstream",
        }
    }
}

fn is_quota_body(body: &str) -> bool {
    let lower = body.to_lowercase();
    QUOTA_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Classify an upstream error by HTTP status and response body.
pub fn classify_status(status: u16, body: &str) -> ErrorClassification {
    match status {
        401 => ErrorClassification::Unauthorized,
        403 if is_quota_body(body) => ErrorClassification::QuotaExceeded,
        403 => ErrorClassification::InsufficientScope,
        404 => ErrorClassification::NotFound,
        429 => ErrorClassification::QuotaExceeded,
        _ => ErrorClassification::Upstream,
    }
}

/// Pull the human-readable message out of a Google error body:
/// `{"error": {"code": 403, "message": "...", "errors": [...]}}`.
/// Falls back to the raw body.
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Turn a non-success upstream response into the matching `Error`.
pub fn into_error(status: u16, body: &str) -> Error {
    let message = extract_error_message(body);
    match classify_status(status, body) {
        ErrorClassification::Unauthorized => Error::Unauthorized(message),
        ErrorClassification::InsufficientScope => Error::InsufficientScope(message),
        ErrorClassification::QuotaExceeded => Error::QuotaExceeded(message),
        ErrorClassification::NotFound => Error::NotFound(message),
        ErrorClassification::Upstream => Error::Upstream { status, message },
    }
}
