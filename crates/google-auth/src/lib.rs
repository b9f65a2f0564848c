//! Google OAuth2 authentication library
//!
//! Owns everything the gateway knows about Google credentials: the scope
//! catalog, the authorization-code flow (with PKCE), token exchange and
//! refresh, and the process-wide token store. No type in this crate hands a
//! raw token to anything but the store and the API client factory.
//!
//! Credential flow:
//! 1. Gateway resolves requested features via `scopes::build_scopes()`
//! 2. `AuthorizationFlow::begin_authorization()` returns the consent URL
//! 3. Google redirects back with `code` + `state`
//! 4. `AuthorizationFlow::complete_authorization()` exchanges the code and
//!    writes the bundle via `TokenStore::put()`
//! 5. API clients read the bundle with `TokenStore::get()` per call and
//!    refresh it through `token::refresh_token()` when it is about to expire

pub mod client;
pub mod constants;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod scopes;
pub mod store;
pub mod token;

pub use client::OAuthClient;
pub use error::{Error, Result};
pub use flow::{AuthorizationFlow, AuthorizationRequest};
pub use scopes::{ScopeSet, build_scopes};
pub use store::{CredentialBundle, InMemoryTokenStore, TokenStore, now_millis};
pub use token::{TokenResponse, exchange_code, refresh_token};
