//! Identity-bound client construction
//!
//! `ClientFactory::for_surface` reads the caller's bundle from the token
//! store at call time and hands back an `ApiClient` holding a copy of the
//! access token. A bundle written after that point does not affect the
//! returned client; the next call picks it up.
//!
//! Request-time refresh: if the token expires within 60 seconds and a refresh
//! token is present, one refresh is attempted inline before the client is
//! built. A rejected refresh drops the bundle; a transient failure keeps it.

use std::sync::Arc;

use common::{IdentityKey, Secret};
use google_auth::constants::REFRESH_THRESHOLD_MILLIS;
use google_auth::{CredentialBundle, OAuthClient, TokenStore, now_millis};
use tracing::{debug, info, warn};

use crate::apis::{DocsApi, DriveApi, SheetsApi, YouTubeAnalyticsApi, YouTubeApi};
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::surface::{ApiEndpoints, Surface};

pub struct ClientFactory {
    store: Arc<dyn TokenStore>,
    oauth: OAuthClient,
    http: reqwest::Client,
    endpoints: ApiEndpoints,
}

impl ClientFactory {
    pub fn new(
        store: Arc<dyn TokenStore>,
        oauth: OAuthClient,
        http: reqwest::Client,
        endpoints: ApiEndpoints,
    ) -> Self {
        Self {
            store,
            oauth,
            http,
            endpoints,
        }
    }

    /// Client for `surface` carrying `identity`'s current access token.
    ///
    /// Fails with `NotAuthenticated`, without any network I/O, when the store
    /// holds no bundle for `identity`.
    pub async fn for_surface(&self, identity: &IdentityKey, surface: Surface) -> Result<ApiClient> {
        let access_token = self.current_access_token(identity).await?;
        debug!(identity = %identity, surface = %surface, "building API client");
        ApiClient::new(
            surface,
            self.http.clone(),
            self.endpoints.base_for(surface),
            access_token,
        )
    }

    pub async fn drive(&self, identity: &IdentityKey) -> Result<DriveApi> {
        Ok(DriveApi::new(self.for_surface(identity, Surface::Drive).await?))
    }

    pub async fn sheets(&self, identity: &IdentityKey) -> Result<SheetsApi> {
        Ok(SheetsApi::new(self.for_surface(identity, Surface::Sheets).await?))
    }

    pub async fn docs(&self, identity: &IdentityKey) -> Result<DocsApi> {
        Ok(DocsApi::new(self.for_surface(identity, Surface::Docs).await?))
    }

    pub async fn youtube(&self, identity: &IdentityKey) -> Result<YouTubeApi> {
        Ok(YouTubeApi::new(
            self.for_surface(identity, Surface::YouTubeData).await?,
        ))
    }

    pub async fn youtube_analytics(&self, identity: &IdentityKey) -> Result<YouTubeAnalyticsApi> {
        Ok(YouTubeAnalyticsApi::new(
            self.for_surface(identity, Surface::YouTubeAnalytics).await?,
        ))
    }

    async fn current_access_token(&self, identity: &IdentityKey) -> Result<Secret<String>> {
        let bundle = self.store.get(identity).ok_or_else(|| {
            Error::NotAuthenticated("no credentials stored for this session".into())
        })?;

        let now = now_millis();
        if !bundle.expires_within(REFRESH_THRESHOLD_MILLIS, now) {
            return Ok(bundle.access_token);
        }

        let Some(refresh) = bundle.refresh_token.clone() else {
            if bundle.is_expired(now) {
                warn!(identity = %identity, "access token expired and no refresh token was granted, dropping credentials");
                self.store.remove(identity);
                return Err(Error::NotAuthenticated(
                    "access token expired; sign in again".into(),
                ));
            }
            return Ok(bundle.access_token);
        };

        debug!(identity = %identity, "access token expiring soon, attempting inline refresh");
        self.refresh(identity, &bundle, refresh.expose(), now).await
    }

    async fn refresh(
        &self,
        identity: &IdentityKey,
        bundle: &CredentialBundle,
        refresh: &str,
        now: u64,
    ) -> Result<Secret<String>> {
        match google_auth::refresh_token(&self.http, &self.oauth, refresh).await {
            Ok(response) => {
                let next = bundle.refreshed(response, now_millis());
                let access_token = next.access_token.clone();
                self.store.put(identity.clone(), next);
                metrics::counter!("gateway_token_refreshes_total", "outcome" => "success")
                    .increment(1);
                info!(identity = %identity, "inline token refresh succeeded");
                Ok(access_token)
            }
            Err(google_auth::Error::InvalidCredentials(msg)) => {
                metrics::counter!("gateway_token_refreshes_total", "outcome" => "rejected")
                    .increment(1);
                warn!(identity = %identity, error = %msg, "refresh token rejected, dropping credentials");
                self.store.remove(identity);
                Err(Error::NotAuthenticated(
                    "stored credentials were revoked; sign in again".into(),
                ))
            }
            Err(e) => {
                metrics::counter!("gateway_token_refreshes_total", "outcome" => "failed")
                    .increment(1);
                if bundle.is_expired(now) {
                    warn!(identity = %identity, error = %e, "refresh failed and access token has expired");
                    Err(Error::Http(format!("token refresh failed: {e}")))
                } else {
                    warn!(identity = %identity, error = %e, "refresh failed, using current access token");
                    Ok(bundle.access_token.clone())
                }
            }
        }
    }
}
