//! Authorization routes
//!
//! - `GET /auth/google?scopes=a,b` starts a flow and redirects to Google
//! - `GET /auth/google/callback` completes it and redirects to the frontend
//! - `GET /auth/success` plain-text landing page
//! - `GET /auth/status`, `POST /auth/logout` behind the gate

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use common::IdentityKey;
use google_auth::scopes::parse_feature_list;
use google_auth::build_scopes;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{GatewayError, Result};
use crate::gate::require_auth;
use crate::session;
use crate::state::AppState;

const SUCCESS_TEXT: &str =
    "Authentication successful! You can close this tab and return to the application.";

pub fn router(state: AppState) -> Router<AppState> {
    let gated = Router::new()
        .route("/status", get(status))
        .route("/logout", post(logout))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/google", get(authorize))
        .route("/google/callback", get(callback))
        .route("/success", get(success))
        .merge(gated)
}

/// 302 Found; browsers follow it with a GET.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    /// Comma-separated feature names, added to the default scopes
    #[serde(default)]
    scopes: Option<String>,
}

async fn authorize(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AuthorizeParams>,
) -> Result<(CookieJar, Response)> {
    let (jar, identity) = session::ensure(jar, &state.session);
    let features = params
        .scopes
        .as_deref()
        .map(parse_feature_list)
        .unwrap_or_default();
    let scopes = build_scopes(&features);

    let request = state.flow.begin_authorization(&identity, scopes)?;
    info!(
        identity = %identity,
        scopes = request.scopes.len(),
        pending = state.flow.pending_len(),
        "redirecting to Google consent"
    );
    Ok((jar, found(&request.url)))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    /// Set by Google when the user denies consent
    error: Option<String>,
}

async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Response)> {
    match complete(&state, jar, params).await {
        Ok((jar, identity)) => {
            crate::metrics::record_token_exchange("success");
            info!(identity = %identity, "sign-in complete");
            Ok((jar, found(&state.frontend_origin)))
        }
        Err(err) => {
            crate::metrics::record_token_exchange("failure");
            warn!(error = %err, "authorization callback failed");
            Err(err)
        }
    }
}

/// Exchange the code and move the session to a fresh id that holds the
/// credentials.
async fn complete(
    state: &AppState,
    jar: CookieJar,
    params: CallbackParams,
) -> Result<(CookieJar, IdentityKey)> {
    if let Some(denied) = params.error {
        return Err(GatewayError::AuthExchangeFailed(format!(
            "authorization denied: {denied}"
        )));
    }
    let caller = session::identity_from(&jar, &state.session).ok_or_else(|| {
        GatewayError::AuthExchangeFailed("callback arrived without a session cookie".into())
    })?;
    let (Some(code), Some(nonce)) = (params.code, params.state) else {
        return Err(GatewayError::AuthExchangeFailed(
            "callback is missing code or state".into(),
        ));
    };

    let (jar, identity) = session::issue(jar, &state.session);
    state
        .flow
        .complete_authorization(&caller, &nonce, &code, &identity)
        .await?;
    Ok((jar, identity))
}

async fn success() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain; charset=utf-8")], SUCCESS_TEXT)
}

async fn status(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
) -> Result<Json<serde_json::Value>> {
    let bundle = state
        .store
        .get(&identity)
        .ok_or_else(|| GatewayError::NotAuthenticated("User not authenticated".into()))?;
    Ok(Json(serde_json::json!({
        "authenticated": true,
        "scopes": bundle.scopes,
    })))
}

async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    state.store.remove(&identity);
    info!(identity = %identity, "signed out");
    (session::expire(jar, &state.session), StatusCode::NO_CONTENT)
}
