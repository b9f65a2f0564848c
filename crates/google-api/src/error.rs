//! Error types for delegated API calls

/// Errors from building clients or calling Google APIs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable credential bundle for the caller
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    /// Google rejected the access token (401)
    #[error("upstream rejected credentials: {0}")]
    Unauthorized(String),

    /// Google refused the call for lack of a granted scope (403)
    #[error("insufficient scope: {0}")]
    InsufficientScope(String),

    /// Google-side quota or rate limit
    #[error("upstream quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("invalid API endpoint configuration: {0}")]
    Config(String),
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;
