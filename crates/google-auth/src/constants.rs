//! Google OAuth constants
//!
//! Endpoints are the defaults; deployments and tests override them through
//! `OAuthClient`.

/// Consent page for the authorization-code flow
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Prefix shared by every Google API scope URI
pub const SCOPE_PREFIX: &str = "https://www.googleapis.com/auth/";

/// Scopes requested on every authorization, in request order.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/youtube.readonly",
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/documents",
];

/// Tokens expiring within this many milliseconds are refreshed before use.
pub const REFRESH_THRESHOLD_MILLIS: u64 = 60_000;
