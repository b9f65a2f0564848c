//! `/api/drive`

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use common::IdentityKey;
use google_api::DriveApi;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{MAX_UPLOAD_BYTES, MultipartForm};
use crate::error::Result;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/files", get(list))
        .route("/files/{file_id}", delete(remove))
        .route("/files/{file_id}/download", get(download))
}

async fn upload(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let file = MultipartForm::read(multipart).await?.take_file("file")?;
    let drive = state.clients.drive(&identity).await?;
    let created = drive
        .upload(&file.file_name, &file.content_type, file.bytes)
        .await?;
    info!(identity = %identity, file_name = %file.file_name, "uploaded file to Drive");
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    q: String,
    page_size: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>> {
    let drive = state.clients.drive(&identity).await?;
    let page_size = params.page_size.unwrap_or(DriveApi::DEFAULT_PAGE_SIZE);
    Ok(Json(drive.list(&params.q, page_size).await?))
}

async fn download(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let drive = state.clients.drive(&identity).await?;
    let download = drive.download(&file_id).await?;
    let content_type = download
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(([(CONTENT_TYPE, content_type)], download.bytes).into_response())
}

async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path(file_id): Path<String>,
) -> Result<StatusCode> {
    let drive = state.clients.drive(&identity).await?;
    drive.delete(&file_id).await?;
    info!(identity = %identity, file_id = %file_id, "deleted Drive file");
    Ok(StatusCode::NO_CONTENT)
}
