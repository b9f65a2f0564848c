//! `/api/sheets`

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
        .route("/{spreadsheet_id}/values/{range}", get(read).put(update))
        .route("/{spreadsheet_id}/values/{range}/append", post(append))
        .route("/{spreadsheet_id}/values/{range}/clear", post(clear))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    title: String,
}

/// Rows of cells, e.g. `[["a", 1], ["b", 2]]`.
#[derive(Debug, Deserialize)]
pub struct ValuesBody {
    values: Value,
}

impl ValuesBody {
    fn rows(self) -> Result<Value> {
        match self.values {
            rows @ Value::Array(_) => Ok(rows),
            _ => Err(GatewayError::BadRequest(
                "values must be an array of rows".into(),
            )),
        }
    }
}

async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Json(body): Json<CreateBody>,
) -> Result<Json<Value>> {
    let sheets = state.clients.sheets(&identity).await?;
    let created = sheets.create(&body.title).await?;
    info!(identity = %identity, "created spreadsheet");
    Ok(Json(created))
}

async fn read(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path((spreadsheet_id, range)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let sheets = state.clients.sheets(&identity).await?;
    Ok(Json(sheets.get_values(&spreadsheet_id, &range).await?))
}

async fn append(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path((spreadsheet_id, range)): Path<(String, String)>,
    Json(body): Json<ValuesBody>,
) -> Result<Json<Value>> {
    let rows = body.rows()?;
    let sheets = state.clients.sheets(&identity).await?;
    Ok(Json(sheets.append_values(&spreadsheet_id, &range, rows).await?))
}

async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path((spreadsheet_id, range)): Path<(String, String)>,
    Json(body): Json<ValuesBody>,
) -> Result<Json<Value>> {
    let rows = body.rows()?;
    let sheets = state.clients.sheets(&identity).await?;
    Ok(Json(sheets.update_values(&spreadsheet_id, &range, rows).await?))
}

async fn clear(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path((spreadsheet_id, range)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let sheets = state.clients.sheets(&identity).await?;
    Ok(Json(sheets.clear_values(&spreadsheet_id, &range).await?))
}

#[cfg(test)]
mod tests {
    use crate::routes::tests::{api_app, json_body, signed_in};
    use crate::state::tests::{sign_in, start_google, state_at};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn create_relays_spreadsheet() {
        let google = start_google().await;
        let state = state_at(&google.base);
        sign_in(&state);

        let response = api_app(state)
            .oneshot(signed_in("POST", "/api/sheets", Some(json!({"title": "Budget"}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "res-1");
        assert_eq!(google.seen.lock().unwrap()[0], "POST /v4/spreadsheets");
    }

    #[tokio::test]
    async fn append_targets_range() {
        let google = start_google().await;
        let state = state_at(&google.base);
        sign_in(&state);

        let response = api_app(state)
            .oneshot(signed_in(
                "POST",
                "/api/sheets/s1/values/Sheet1!A1/append",
                Some(json!({"values": [["a", 1]]})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let seen = google.seen.lock().unwrap();
        assert!(seen[0].starts_with("POST /v4/spreadsheets/s1/values/Sheet1!A1:append?"));
        assert!(seen[0].contains("valueInputOption=USER_ENTERED"));
    }

    #[tokio::test]
    async fn non_array_values_are_rejected() {
        let google = start_google().await;
        let state = state_at(&google.base);
        sign_in(&state);

        let response = api_app(state)
            .oneshot(signed_in(
                "PUT",
                "/api/sheets/s1/values/A1",
                Some(json!({"values": "nope"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(google.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_and_clear() {
        let google = start_google().await;
        let state = state_at(&google.base);
        sign_in(&state);
        let app = api_app(state);

        let response = app
            .clone()
            .oneshot(signed_in("GET", "/api/sheets/s1/values/A1:B2", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app
            .oneshot(signed_in("POST", "/api/sheets/s1/values/A1:B2/clear", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = google.seen.lock().unwrap();
        assert_eq!(seen[0], "GET /v4/spreadsheets/s1/values/A1:B2");
        assert_eq!(seen[1], "POST /v4/spreadsheets/s1/values/A1:B2:clear");
    }
}
