//! Google Workspace Gateway
//!
//! Single-binary Rust service that:
//! 1. Runs the Google OAuth2 authorization-code flow for browser sessions
//! 2. Keeps each session's credentials server-side, refreshing them on use
//! 3. Exposes Drive, Sheets, Docs and YouTube operations under `/api`
//! 4. Rate-limits quota-heavy YouTube calls per session

mod auth;
mod config;
mod error;
mod gate;
mod metrics;
mod routes;
mod session;
mod state;

use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, cli_config_path};
use crate::state::AppState;

/// How long in-flight requests may run after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const BANNER: &str = "GCP Integration Backend is running!";

/// Build the axum router with all routes and shared state.
///
/// The concurrency limit caps in-flight requests at `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Result<Router> {
    let cors = build_cors_layer(&state.frontend_origin)?;

    Ok(Router::new()
        .route("/", get(banner_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/auth", auth::router(state.clone()))
        .nest("/api", routes::api_router(state.clone()))
        .layer(from_fn(gate::request_logging))
        .layer(cors)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state))
}

/// The browser frontend is the only allowed origin. Credentials (the session
/// cookie) are allowed, so methods and headers are listed explicitly.
fn build_cors_layer(frontend_origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = frontend_origin
        .parse()
        .with_context(|| format!("frontend origin {frontend_origin} is not a valid header value"))?;

    Ok(CorsLayer::new()
        .allow_origin([origin])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting workspace-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    let args: Vec<String> = std::env::args().collect();
    let source = Config::resolve_path(cli_config_path(&args));
    info!(path = %source.display(), explicit = source.explicit, "loading configuration");

    let config = Config::load(&source)
        .with_context(|| format!("failed to load config from {}", source.display()))?;

    let listen_addr = config.server.listen_addr();
    info!(
        listen_addr = %listen_addr,
        frontend_origin = %config.server.frontend_origin,
        redirect_uri = %config.google.redirect_uri,
        rate_limit_window_secs = config.rate_limit.window_secs,
        rate_limit_max_requests = config.rate_limit.max_requests,
        "configuration loaded"
    );

    let app_state = AppState::from_config(&config, prometheus_handle)?;
    let app = build_router(app_state, config.server.max_connections)?;

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires: the server is
    // told to drain, then the drain is raced against DRAIN_TIMEOUT.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn banner_handler() -> &'static str {
    BANNER
}

/// Liveness plus a count of identities currently holding credentials.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "authenticated_identities": state.store.len(),
        "rate_limited_identities": state.limiter.tracked_identities(),
        "pending_authorizations": state.flow.pending_len(),
    });
    (
        axum::http::StatusCode::OK,
        [(CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::{Part, multipart_request};
    use crate::state::tests::{MockGoogle, start_google, state_at};
    use axum::body::Body;
    use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use google_auth::constants::DEFAULT_SCOPES;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        build_router(state, 100).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Run the consent redirect and callback for a fresh browser; returns the
    /// rotated session cookie that now holds credentials.
    async fn sign_in_through_flow(app: &Router, google: &MockGoogle) -> String {
        let response = app.clone().oneshot(get("/auth/google", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);

        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let location = response.headers()[LOCATION].to_str().unwrap();
        let params: HashMap<String, String> = reqwest::Url::parse(location)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let requested: Vec<&str> = params["scope"].split(' ').collect();
        for scope in DEFAULT_SCOPES {
            assert!(requested.contains(scope), "missing {scope}");
        }

        let callback = format!(
            "/auth/google/callback?code=good&state={}",
            params["state"]
        );
        let response = app.clone().oneshot(get(&callback, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            google.token_hits.load(std::sync::atomic::Ordering::SeqCst),
            1
        );

        // Sign-in moves the browser to a new session id.
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        let signed_in = set_cookie.split(';').next().unwrap().to_string();
        assert_ne!(signed_in, cookie);
        let response = app.clone().oneshot(get("/auth/status", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        signed_in
    }

    #[tokio::test]
    async fn banner_is_plain_text() {
        let response = app(state_at("http://127.0.0.1:9"))
            .oneshot(get("/", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, BANNER);
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let state = state_at("http://127.0.0.1:9");
        crate::state::tests::sign_in(&state);
        let response = app(state).oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["authenticated_identities"], 1);
        assert!(json["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn metrics_endpoint_is_prometheus_text() {
        let response = app(state_at("http://127.0.0.1:9"))
            .oneshot(get("/metrics", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; version=0.0.4; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn cors_allows_frontend_with_credentials() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/drive/files")
            .header("origin", "http://localhost:5174")
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap();
        let response = app(state_at("http://127.0.0.1:9")).oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(
            headers["access-control-allow-origin"],
            "http://localhost:5174"
        );
        assert_eq!(headers["access-control-allow-credentials"], "true");
    }

    #[tokio::test]
    async fn cors_ignores_other_origins() {
        let request = Request::get("/")
            .header("origin", "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app(state_at("http://127.0.0.1:9")).oneshot(request).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn invalid_origin_fails_router_build() {
        let mut state = state_at("http://127.0.0.1:9");
        state.frontend_origin = "http://bad\norigin".into();
        assert!(build_router(state, 10).is_err());
    }

    #[tokio::test]
    async fn end_to_end_session_lifecycle() {
        let google = start_google().await;
        let app = app(state_at(&google.base));

        // Unauthenticated access is refused before any upstream call.
        let response = app.clone().oneshot(get("/api/drive/files", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = app.clone().oneshot(get("/auth/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let cookie = sign_in_through_flow(&app, &google).await;

        let response = app
            .clone()
            .oneshot(get("/auth/status", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let status: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(status["authenticated"], true);

        // Five uploads are admitted, the sixth inside the window is refused.
        for i in 0..6 {
            let request = multipart_request(
                "/api/youtube/upload",
                &cookie,
                &[
                    Part::File {
                        name: "video",
                        file_name: "clip.mp4",
                        content_type: "video/mp4",
                        bytes: b"mp4",
                    },
                    Part::Text("title", "Clip"),
                    Part::Text("description", "desc"),
                    Part::Text("privacyStatus", "unlisted"),
                ],
            );
            let response = app.clone().oneshot(request).await.unwrap();
            let expected = if i < 5 {
                StatusCode::OK
            } else {
                StatusCode::TOO_MANY_REQUESTS
            };
            assert_eq!(response.status(), expected, "upload #{}", i + 1);
        }
        assert_eq!(google.seen.lock().unwrap().len(), 5);

        // Logout drops the credentials; the same cookie is refused afterwards.
        let response = app
            .clone()
            .oneshot(
                Request::post("/auth/logout")
                    .header(COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.oneshot(get("/api/drive/files", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let google = start_google().await;
        let state = state_at(&google.base);
        let app = app(state.clone());

        let cookie = sign_in_through_flow(&app, &google).await;
        let other = "gateway_session=9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";

        let response = app
            .clone()
            .oneshot(get("/auth/status", Some(other)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = app.oneshot(get("/auth/status", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.store.len(), 1);
    }
}
