//! OAuth token exchange and refresh
//!
//! Both operations POST form-encoded bodies to the client's token endpoint.
//! Neither is retried: an authorization code is single-use, and a refresh
//! that failed once is left for the next request to attempt.

use serde::{Deserialize, Serialize};

use crate::client::OAuthClient;
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds. Google omits `refresh_token` on
/// refresh responses and on exchanges made without `prompt=consent`.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    /// Space-delimited scopes actually granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    oauth: &OAuthClient,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse> {
    let response = http
        .post(&oauth.token_endpoint)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", verifier),
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.expose().as_str()),
            ("redirect_uri", oauth.redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
}

/// Refresh an access token using a refresh token.
///
/// Google answers a revoked or expired refresh token with 400
/// `invalid_grant`; that and 401/403 surface as `InvalidCredentials`.
pub async fn refresh_token(
    http: &reqwest::Client,
    oauth: &OAuthClient,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = http
        .post(&oauth.token_endpoint)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 || body.contains("invalid_grant") {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
}
