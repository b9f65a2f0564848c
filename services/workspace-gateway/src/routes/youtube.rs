//! `/api/youtube`
//!
//! Upload, list, update and delete spend YouTube Data quota and pass through
//! the per-identity rate limiter. Single-video reads do not.

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use common::IdentityKey;
use google_api::{VideoDetails, VideoListParams, split_tags};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{MAX_UPLOAD_BYTES, MultipartForm};
use crate::error::{GatewayError, Result};
use crate::gate::rate_limit;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let limited = Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/videos", get(list))
        .route("/videos/{video_id}", put(update).delete(remove))
        .route_layer(from_fn_with_state(state, rate_limit));

    Router::new()
        .route("/videos/{video_id}/analyze", get(analyze))
        .route("/videos/{video_id}/analytics", get(analytics))
        .merge(limited)
}

async fn upload(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let mut form = MultipartForm::read(multipart).await?;
    let video = form.take_file("video")?;
    let details = VideoDetails {
        title: Some(form.required("title")?.to_string()),
        description: Some(form.required("description")?.to_string()),
        tags: split_tags(form.text("tags")),
        privacy_status: Some(form.required("privacyStatus")?.to_string()),
    };

    let youtube = state.clients.youtube(&identity).await?;
    let created = youtube
        .upload(&details, video.bytes, &video.content_type)
        .await?;
    info!(
        identity = %identity,
        file_name = %video.file_name,
        video_id = created.get("id").and_then(serde_json::Value::as_str).unwrap_or_default(),
        "uploaded video"
    );
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    part: Option<String>,
    max_results: Option<u32>,
    #[serde(default)]
    mine: bool,
    my_rating: Option<String>,
    chart: Option<String>,
}

impl From<ListQuery> for VideoListParams {
    fn from(query: ListQuery) -> Self {
        let defaults = VideoListParams::default();
        Self {
            part: query.part.unwrap_or(defaults.part),
            max_results: query.max_results.unwrap_or(defaults.max_results),
            mine: query.mine,
            my_rating: query.my_rating,
            chart: query.chart,
        }
    }
}

async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>> {
    let youtube = state.clients.youtube(&identity).await?;
    Ok(Json(youtube.list(&query.into()).await?))
}

/// Tags arrive either as a JSON array or as a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    List(Vec<String>),
    Joined(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    title: Option<String>,
    description: Option<String>,
    tags: Option<Tags>,
    privacy_status: Option<String>,
}

impl From<UpdateBody> for VideoDetails {
    fn from(body: UpdateBody) -> Self {
        let tags = match body.tags {
            Some(Tags::List(tags)) => tags,
            Some(Tags::Joined(joined)) => split_tags(Some(&joined)),
            None => Vec::new(),
        };
        Self {
            title: body.title,
            description: body.description,
            tags,
            privacy_status: body.privacy_status,
        }
    }
}

async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path(video_id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Value>> {
    let youtube = state.clients.youtube(&identity).await?;
    let updated = youtube.update(&video_id, &body.into()).await?;
    info!(identity = %identity, video_id = %video_id, "updated video");
    Ok(Json(updated))
}

async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path(video_id): Path<String>,
) -> Result<StatusCode> {
    let youtube = state.clients.youtube(&identity).await?;
    youtube.delete(&video_id).await?;
    info!(identity = %identity, video_id = %video_id, "deleted video");
    Ok(StatusCode::NO_CONTENT)
}

async fn analyze(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path(video_id): Path<String>,
) -> Result<Json<Value>> {
    let youtube = state.clients.youtube(&identity).await?;
    Ok(Json(youtube.analyze(&video_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn analytics(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Path(video_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>> {
    let (Some(start_date), Some(end_date)) = (query.start_date, query.end_date) else {
        return Err(GatewayError::BadRequest(
            "startDate and endDate are required (YYYY-MM-DD)".into(),
        ));
    };

    let channel_id = state.clients.youtube(&identity).await?.my_channel_id().await?;
    let report = state
        .clients
        .youtube_analytics(&identity)
        .await?
        .video_report(&channel_id, &video_id, &start_date, &end_date)
        .await?;
    Ok(Json(report))
}
