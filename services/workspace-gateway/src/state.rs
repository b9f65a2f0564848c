//! Shared application state

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use google_api::ClientFactory;
use google_auth::{AuthorizationFlow, InMemoryTokenStore, OAuthClient, TokenStore};
use metrics_exporter_prometheus::PrometheusHandle;
use rate_limit::RateLimiter;

use crate::config::{Config, SessionConfig};

/// State handed to every handler and middleware. Cloning is cheap; every
/// component that holds data sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TokenStore>,
    pub flow: Arc<AuthorizationFlow>,
    pub clients: Arc<ClientFactory>,
    pub limiter: Arc<RateLimiter>,
    pub session: SessionConfig,
    pub frontend_origin: String,
    pub started_at: Instant,
    pub prometheus: PrometheusHandle,
}

impl AppState {
    /// Wire the token store, authorization flow, client factory and limiter
    /// from a validated config. One `reqwest::Client` is shared by the token
    /// endpoint calls and every Google API call.
    pub fn from_config(config: &Config, prometheus: PrometheusHandle) -> anyhow::Result<Self> {
        let client_secret = config
            .google
            .client_secret
            .clone()
            .context("google client secret is not configured")?;
        let oauth = OAuthClient::new(
            config.google.client_id.clone(),
            client_secret,
            config.google.redirect_uri.clone(),
        )
        .with_endpoints(
            config.google.authorize_endpoint.clone(),
            config.google.token_endpoint.clone(),
        );

        let http = reqwest::Client::new();
        let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
        let flow = AuthorizationFlow::new(oauth.clone(), http.clone(), store.clone());
        let clients = ClientFactory::new(store.clone(), oauth, http, config.google.api.clone());
        let limiter = RateLimiter::new(config.rate_limit.window(), config.rate_limit.max_requests);

        Ok(Self {
            store,
            flow: Arc::new(flow),
            clients: Arc::new(clients),
            limiter: Arc::new(limiter),
            session: config.session.clone(),
            frontend_origin: config.server.frontend_origin.clone(),
            started_at: Instant::now(),
            prometheus,
        })
    }
}
