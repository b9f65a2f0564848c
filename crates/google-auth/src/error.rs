//! Error types for OAuth authentication operations

/// Errors from OAuth authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid authorization state: {0}")]
    InvalidState(String),

    #[error("too many pending authorizations ({0})")]
    TooManyPending(usize),

    #[error("invalid OAuth client configuration: {0}")]
    Config(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
