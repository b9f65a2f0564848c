//! `/api/docs`

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use common::IdentityKey;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{GatewayError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{document_id}", get(fetch))
        .route("/{document_id}/batchUpdate", post(batch_update))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    title: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchUpdateBody {
    requests: Vec<Value>,
}

async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Json(body): Json<CreateBody>,
) -> Result<Json<Value>> {
    let docs = state.clients.docs(&identity).await?;
    let created = docs.create(&body.title).await?;
    info!(identity = %identity, "created document");
    Ok(Json(created))
}

async fn fetch(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>> {
    let docs = state.clients.docs(&identity).await?;
    Ok(Json(docs.get(&document_id).await?))
}

async fn batch_update(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path(document_id): Path<String>,
    Json(body): Json<BatchUpdateBody>,
) -> Result<Json<Value>> {
    if body.requests.is_empty() {
        return Err(GatewayError::BadRequest("requests must not be empty".into()));
    }
    let docs = state.clients.docs(&identity).await?;
    Ok(Json(
        docs.batch_update(&document_id, Value::Array(body.requests))
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::routes::tests::{api_app, json_body, signed_in};
    use crate::state::tests::{sign_in, start_google, state_at};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn fetch_relays_document() {
        let google = start_google().await;
        let state = state_at(&google.base);
        sign_in(&state);

        let response = api_app(state)
            .oneshot(signed_in("GET", "/api/docs/doc-9", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "res-1");
        assert_eq!(google.seen.lock().unwrap()[0], "GET /v1/documents/doc-9");
    }

    #[tokio::test]
    async fn batch_update_forwards_requests() {
        let google = start_google().await;
        let state = state_at(&google.base);
        sign_in(&state);

        let body = json!({
            "requests": [{"insertText": {"location": {"index": 1}, "text": "Hello"}}]
        });
        let response = api_app(state)
            .oneshot(signed_in("POST", "/api/docs/doc-9/batchUpdate", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            google.seen.lock().unwrap()[0],
            "POST /v1/documents/doc-9:batchUpdate"
        );
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let google = start_google().await;
        let state = state_at(&google.base);
        sign_in(&state);

        let response = api_app(state)
            .oneshot(signed_in(
                "POST",
                "/api/docs/doc-9/batchUpdate",
                Some(json!({"requests": []})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
