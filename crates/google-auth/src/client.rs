//! OAuth client registration
//!
//! The one OAuth client object the gateway shares across every identity. It
//! carries the registered client credentials and endpoints; tokens are never
//! installed on it, each API call gets its own snapshot instead.

use common::Secret;

use crate::constants::{AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT};
use crate::error::{Error, Result};
use crate::scopes::ScopeSet;

#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
}

impl OAuthClient {
    /// Client against Google's production endpoints.
    pub fn new(client_id: String, client_secret: Secret<String>, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            authorize_endpoint: AUTHORIZE_ENDPOINT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoints(mut self, authorize_endpoint: String, token_endpoint: String) -> Self {
        self.authorize_endpoint = authorize_endpoint;
        self.token_endpoint = token_endpoint;
        self
    }

    /// Build the consent URL.
    ///
    /// `access_type=offline` makes Google issue a refresh token and
    /// `prompt=consent` makes it issue one again on repeat authorizations.
    /// Only the scopes passed in are requested; previously granted scopes
    /// are not folded back in.
    pub fn authorization_url(
        &self,
        scopes: &ScopeSet,
        state: &str,
        challenge: &str,
    ) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.authorize_endpoint).map_err(|e| {
            Error::Config(format!(
                "authorize endpoint {} is not a URL: {e}",
                self.authorize_endpoint
            ))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.to_param())
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state)
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url.into())
    }
}
