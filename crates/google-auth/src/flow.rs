//! Authorization-code flow
//!
//! `begin_authorization` records a pending flow under a fresh `state` nonce
//! and returns the consent URL. `complete_authorization` consumes that entry,
//! exchanges the code exactly once, and writes the resulting bundle into the
//! token store under the identity the caller grants it to.
//!
//! An identity has at most one pending flow; starting another replaces it.
//! Pending entries expire after `PENDING_EXPIRY` and are swept lazily on
//! each new flow. Past `MAX_PENDING` live entries new flows are refused.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::IdentityKey;
use tracing::{info, warn};

use crate::client::OAuthClient;
use crate::error::{Error, Result};
use crate::pkce;
use crate::scopes::ScopeSet;
use crate::store::{CredentialBundle, TokenStore, now_millis};
use crate::token;

/// Maximum age of a pending authorization before its callback is refused.
pub const PENDING_EXPIRY: Duration = Duration::from_secs(600);

/// Ceiling on flows awaiting their callback across all identities.
pub const MAX_PENDING: usize = 10_000;

struct PendingAuthorization {
    identity: IdentityKey,
    verifier: String,
    scopes: ScopeSet,
    created_at: Instant,
}

/// A started authorization: where to send the browser and what was asked.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub scopes: ScopeSet,
}

pub struct AuthorizationFlow {
    oauth: OAuthClient,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    pending: Mutex<HashMap<String, PendingAuthorization>>,
    max_pending: usize,
}

impl AuthorizationFlow {
    pub fn new(oauth: OAuthClient, http: reqwest::Client, store: Arc<dyn TokenStore>) -> Self {
        Self {
            oauth,
            http,
            store,
            pending: Mutex::new(HashMap::new()),
            max_pending: MAX_PENDING,
        }
    }

    pub fn with_pending_limit(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Start a flow for `identity` requesting `scopes`, replacing any flow
    /// that identity already has pending. No network I/O.
    pub fn begin_authorization(
        &self,
        identity: &IdentityKey,
        scopes: ScopeSet,
    ) -> Result<AuthorizationRequest> {
        let verifier = pkce::generate_verifier();
        let challenge = pkce::compute_challenge(&verifier);
        let state = pkce::generate_state();
        let url = self.oauth.authorization_url(&scopes, &state, &challenge)?;

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|_, p| p.created_at.elapsed() < PENDING_EXPIRY && &p.identity != identity);
        if pending.len() >= self.max_pending {
            let waiting = pending.len();
            drop(pending);
            warn!(pending = waiting, "refusing new authorization flow, too many pending");
            return Err(Error::TooManyPending(waiting));
        }
        pending.insert(
            state.clone(),
            PendingAuthorization {
                identity: identity.clone(),
                verifier,
                scopes: scopes.clone(),
                created_at: Instant::now(),
            },
        );
        drop(pending);

        info!(identity = %identity, scopes = scopes.len(), "authorization flow started");
        Ok(AuthorizationRequest { url, state, scopes })
    }

    /// Finish the flow identified by `state` with the one-time `code`,
    /// called from the session `caller`.
    ///
    /// The bundle is stored under `grant_to` and any bundle held by `caller`
    /// is dropped, so the session id that existed before sign-in never
    /// carries the new credentials. A callback from a session other than the
    /// one that began the flow leaves the pending entry in place. Otherwise
    /// the entry is consumed before the exchange, so a replayed callback
    /// fails even if the first exchange did.
    pub async fn complete_authorization(
        &self,
        caller: &IdentityKey,
        state: &str,
        code: &str,
        grant_to: &IdentityKey,
    ) -> Result<CredentialBundle> {
        let pending = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            let started_by_caller = pending.get(state).map(|entry| &entry.identity == caller);
            match started_by_caller {
                None => None,
                Some(false) => {
                    drop(pending);
                    warn!(
                        identity = %caller,
                        "callback session does not match the session that started the flow"
                    );
                    return Err(Error::InvalidState(
                        "callback session does not match the session that started the flow".into(),
                    ));
                }
                Some(true) => pending.remove(state),
            }
        }
        .ok_or_else(|| {
            Error::InvalidState("no pending authorization for this state (expired or unknown)".into())
        })?;

        if pending.created_at.elapsed() > PENDING_EXPIRY {
            return Err(Error::InvalidState(format!(
                "authorization started more than {}s ago",
                PENDING_EXPIRY.as_secs()
            )));
        }

        let response = token::exchange_code(&self.http, &self.oauth, code, &pending.verifier).await?;
        let mut bundle = CredentialBundle::from_token_response(response, now_millis());
        if bundle.scopes.is_empty() {
            bundle.scopes = pending.scopes;
        }

        self.store.put(grant_to.clone(), bundle.clone());
        if caller != grant_to {
            self.store.remove(caller);
        }
        info!(
            identity = %grant_to,
            has_refresh_token = bundle.refresh_token.is_some(),
            "authorization completed, credentials stored"
        );
        Ok(bundle)
    }

    /// Number of flows awaiting their callback.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTokenStore;
    use axum::http::StatusCode;
    use axum::routing::post;
    use common::Secret;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    async fn start_token_endpoint(status: StatusCode, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route(
            "/token",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        status,
                        [(axum::http::header::CONTENT_TYPE, "application/json")],
                        body,
                    )
                }
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/token"), hits)
    }

    fn test_flow(token_endpoint: String) -> (AuthorizationFlow, Arc<InMemoryTokenStore>) {
        let store = Arc::new(InMemoryTokenStore::new());
        let oauth = OAuthClient::new(
            "client-id".into(),
            Secret::new("secret".into()),
            "http://localhost:3000/auth/google/callback".into(),
        )
        .with_endpoints("https://accounts.example/auth".into(), token_endpoint);
        let flow = AuthorizationFlow::new(oauth, reqwest::Client::new(), store.clone());
        (flow, store)
    }

    #[test]
    fn begin_records_pending_and_returns_url_with_state() {
        let (flow, store) = test_flow("http://unused/token".into());
        let identity = IdentityKey::from("sess-1");

        let request = flow
            .begin_authorization(&identity, ScopeSet::defaults())
            .unwrap();
        assert!(request.url.starts_with("https://accounts.example/auth?"));
        assert!(request.url.contains(&format!("state={}", request.state)));
        assert!(request.url.contains("access_type=offline"));
        assert!(request.url.contains("prompt=consent"));
        assert_eq!(flow.pending_len(), 1);
        assert!(!store.has(&identity), "beginning a flow stores nothing");
    }

    #[tokio::test]
    async fn complete_stores_bundle_under_identity() {
        let (endpoint, hits) = start_token_endpoint(
            StatusCode::OK,
            r#"{"access_token":"ya29.ok","refresh_token":"1//r","expires_in":3600,"scope":"openid"}"#,
        )
        .await;
        let (flow, store) = test_flow(endpoint);
        let identity = IdentityKey::from("sess-1");
        let request = flow
            .begin_authorization(&identity, ScopeSet::defaults())
            .unwrap();

        let bundle = flow
            .complete_authorization(&identity, &request.state, "4/code", &identity)
            .await
            .unwrap();
        assert_eq!(bundle.access_token.expose(), "ya29.ok");
        assert!(store.has(&identity));
        assert_eq!(
            store.get(&identity).unwrap().access_token.expose(),
            "ya29.ok"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(flow.pending_len(), 0);
    }

    #[tokio::test]
    async fn complete_without_granted_scope_field_records_requested_scopes() {
        let (endpoint, _) = start_token_endpoint(
            StatusCode::OK,
            r#"{"access_token":"ya29.ok","expires_in":3600}"#,
        )
        .await;
        let (flow, _) = test_flow(endpoint);
        let identity = IdentityKey::from("sess");
        let scopes = crate::build_scopes(&["drive.file"]);
        let request = flow.begin_authorization(&identity, scopes.clone()).unwrap();

        let bundle = flow
            .complete_authorization(&identity, &request.state, "c", &identity)
            .await
            .unwrap();
        assert_eq!(bundle.scopes, scopes);
    }

    #[tokio::test]
    async fn rejected_code_fails_and_stores_nothing() {
        let (endpoint, hits) =
            start_token_endpoint(StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#).await;
        let (flow, store) = test_flow(endpoint);
        let identity = IdentityKey::from("sess");
        let request = flow
            .begin_authorization(&identity, ScopeSet::defaults())
            .unwrap();

        let err = flow
            .complete_authorization(&identity, &request.state, "bad", &identity)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenExchange(_)), "got {err:?}");
        assert!(!store.has(&identity));
        assert_eq!(hits.load(Ordering::SeqCst), 1, "code exchange must not retry");
    }

    #[tokio::test]
    async fn replayed_state_is_refused_without_network_call() {
        let (endpoint, hits) = start_token_endpoint(
            StatusCode::OK,
            r#"{"access_token":"ya29.ok","expires_in":3600}"#,
        )
        .await;
        let (flow, _) = test_flow(endpoint);
        let identity = IdentityKey::from("sess");
        let request = flow
            .begin_authorization(&identity, ScopeSet::defaults())
            .unwrap();

        flow.complete_authorization(&identity, &request.state, "c", &identity)
            .await
            .unwrap();
        let err = flow
            .complete_authorization(&identity, &request.state, "c", &identity)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_state_is_refused() {
        let (flow, _) = test_flow("http://127.0.0.1:1/token".into());
        let err = flow
            .complete_authorization(&IdentityKey::from("sess"), "never-issued", "c", &IdentityKey::from("sess"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn callback_from_other_session_is_refused() {
        let (endpoint, hits) = start_token_endpoint(
            StatusCode::OK,
            r#"{"access_token":"ya29.ok","expires_in":3600}"#,
        )
        .await;
        let (flow, store) = test_flow(endpoint);
        let starter = IdentityKey::from("victim");
        let request = flow
            .begin_authorization(&starter, ScopeSet::defaults())
            .unwrap();

        let attacker = IdentityKey::from("attacker");
        let err = flow
            .complete_authorization(&attacker, &request.state, "c", &attacker)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(!store.has(&attacker));
        assert!(!store.has(&starter));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        // The starter's flow survives the foreign callback.
        assert_eq!(flow.pending_len(), 1);
        flow.complete_authorization(&starter, &request.state, "c", &starter)
            .await
            .unwrap();
        assert!(store.has(&starter));
    }

    #[tokio::test]
    async fn credentials_land_under_granted_identity_only() {
        let (endpoint, _) = start_token_endpoint(
            StatusCode::OK,
            r#"{"access_token":"ya29.new","expires_in":3600}"#,
        )
        .await;
        let (flow, store) = test_flow(endpoint);
        let before = IdentityKey::from("pre-sign-in");
        let after = IdentityKey::from("post-sign-in");
        store.put(
            before.clone(),
            CredentialBundle {
                access_token: Secret::new("ya29.old".into()),
                refresh_token: None,
                expires_at: now_millis() + 3_600_000,
                scopes: ScopeSet::defaults(),
            },
        );
        let request = flow
            .begin_authorization(&before, ScopeSet::defaults())
            .unwrap();

        flow.complete_authorization(&before, &request.state, "c", &after)
            .await
            .unwrap();
        assert!(!store.has(&before));
        assert_eq!(store.get(&after).unwrap().access_token.expose(), "ya29.new");
    }

    #[test]
    fn new_flow_replaces_identitys_pending_flow() {
        let (flow, _) = test_flow("http://unused/token".into());
        let identity = IdentityKey::from("sess");

        let first = flow
            .begin_authorization(&identity, ScopeSet::defaults())
            .unwrap();
        let second = flow
            .begin_authorization(&identity, ScopeSet::defaults())
            .unwrap();
        assert_ne!(first.state, second.state);
        assert_eq!(flow.pending_len(), 1);

        flow.begin_authorization(&IdentityKey::from("other"), ScopeSet::defaults())
            .unwrap();
        assert_eq!(flow.pending_len(), 2);
    }

    #[tokio::test]
    async fn replaced_flow_state_is_refused() {
        let (flow, _) = test_flow("http://127.0.0.1:1/token".into());
        let identity = IdentityKey::from("sess");
        let first = flow
            .begin_authorization(&identity, ScopeSet::defaults())
            .unwrap();
        flow.begin_authorization(&identity, ScopeSet::defaults())
            .unwrap();

        let err = flow
            .complete_authorization(&identity, &first.state, "c", &identity)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn pending_ceiling_refuses_new_flows() {
        let (flow, _) = test_flow("http://unused/token".into());
        let flow = flow.with_pending_limit(3);
        for i in 0..3 {
            flow.begin_authorization(&IdentityKey::from(format!("sess-{i}")), ScopeSet::defaults())
                .unwrap();
        }

        let err = flow
            .begin_authorization(&IdentityKey::from("sess-3"), ScopeSet::defaults())
            .unwrap_err();
        assert!(matches!(err, Error::TooManyPending(3)));
        assert_eq!(flow.pending_len(), 3);

        // Restarting an identity's own flow still fits under the ceiling.
        flow.begin_authorization(&IdentityKey::from("sess-0"), ScopeSet::defaults())
            .unwrap();
        assert_eq!(flow.pending_len(), 3);
    }
}
