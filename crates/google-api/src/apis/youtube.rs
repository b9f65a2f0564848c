//! YouTube Data v3: videos, search, channels

use bytes::Bytes;
use serde_json::{Map, Value, json};

use crate::client::ApiClient;
use crate::error::{Error, Result};

/// "People & Blogs"; every upload and update is filed under it.
const CATEGORY_ID: &str = "22";

const VIDEO_PARTS: &str = "snippet,status";
const ANALYZE_PARTS: &str = "snippet,statistics,contentDetails,status";

/// Editable video metadata. Absent fields are omitted from the request.
#[derive(Debug, Clone, Default)]
pub struct VideoDetails {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub privacy_status: Option<String>,
}

impl VideoDetails {
    fn to_resource(&self, video_id: Option<&str>) -> Value {
        let mut snippet = Map::new();
        if let Some(title) = &self.title {
            snippet.insert("title".into(), json!(title));
        }
        if let Some(description) = &self.description {
            snippet.insert("description".into(), json!(description));
        }
        snippet.insert("tags".into(), json!(self.tags));
        snippet.insert("categoryId".into(), json!(CATEGORY_ID));

        let mut status = Map::new();
        if let Some(privacy) = &self.privacy_status {
            status.insert("privacyStatus".into(), json!(privacy));
        }

        let mut resource = Map::new();
        if let Some(id) = video_id {
            resource.insert("id".into(), json!(id));
        }
        resource.insert("snippet".into(), Value::Object(snippet));
        resource.insert("status".into(), Value::Object(status));
        Value::Object(resource)
    }
}

/// Split a comma-separated tag list, trimming whitespace and dropping blanks.
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parameters for a video search.
#[derive(Debug, Clone)]
pub struct VideoListParams {
    pub part: String,
    pub max_results: u32,
    /// Only the caller's own uploads
    pub mine: bool,
    pub my_rating: Option<String>,
    pub chart: Option<String>,
}

impl Default for VideoListParams {
    fn default() -> Self {
        Self {
            part: "snippet".into(),
            max_results: 10,
            mine: false,
            my_rating: None,
            chart: None,
        }
    }
}

pub struct YouTubeApi {
    client: ApiClient,
}

impl YouTubeApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn upload(&self, details: &VideoDetails, media: Bytes, media_type: &str) -> Result<Value> {
        self.client
            .upload_multipart(
                &["upload", "youtube", "v3", "videos"],
                &[("uploadType", "multipart"), ("part", VIDEO_PARTS)],
                &details.to_resource(None),
                media,
                media_type,
            )
            .await
    }

    /// Search for videos. Returns the `items` array.
    pub async fn list(&self, params: &VideoListParams) -> Result<Value> {
        let max_results = params.max_results.to_string();
        let mut query = vec![
            ("part", params.part.as_str()),
            ("maxResults", max_results.as_str()),
            ("type", "video"),
        ];
        if params.mine {
            query.push(("forMine", "true"));
        }
        if let Some(rating) = &params.my_rating {
            query.push(("videoRating", rating.as_str()));
        }
        if let Some(chart) = &params.chart {
            query.push(("chart", chart.as_str()));
        }
        let mut response = self
            .client
            .get_json(&["youtube", "v3", "search"], &query)
            .await?;
        Ok(take_items(&mut response))
    }

    pub async fn update(&self, video_id: &str, details: &VideoDetails) -> Result<Value> {
        self.client
            .put_json(
                &["youtube", "v3", "videos"],
                &[("part", VIDEO_PARTS)],
                &details.to_resource(Some(video_id)),
            )
            .await
    }

    pub async fn delete(&self, video_id: &str) -> Result<()> {
        self.client
            .delete(&["youtube", "v3", "videos"], &[("id", video_id)])
            .await
    }

    /// Snippet, statistics, content details and status for one video.
    pub async fn analyze(&self, video_id: &str) -> Result<Value> {
        let mut response = self
            .client
            .get_json(
                &["youtube", "v3", "videos"],
                &[("part", ANALYZE_PARTS), ("id", video_id)],
            )
            .await?;
        first_item(&mut response).ok_or_else(|| Error::NotFound(format!("video {video_id}")))
    }

    /// Channel id of the authenticated user.
    pub async fn my_channel_id(&self) -> Result<String> {
        let mut response = self
            .client
            .get_json(
                &["youtube", "v3", "channels"],
                &[("part", "id"), ("mine", "true")],
            )
            .await?;
        first_item(&mut response)
            .and_then(|channel| channel.get("id").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| Error::NotFound("no channel for the authenticated user".into()))
    }
}

fn take_items(response: &mut Value) -> Value {
    response
        .get_mut("items")
        .map(Value::take)
        .unwrap_or_else(|| Value::Array(Vec::new()))
}

fn first_item(response: &mut Value) -> Option<Value> {
    match take_items(response) {
        Value::Array(mut items) if !items.is_empty() => Some(items.swap_remove(0)),
        _ => None,
    }
}
