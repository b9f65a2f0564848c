//! Per-call Google API client
//!
//! An `ApiClient` is built for one request and one surface. It owns a
//! snapshot of the caller's access token; the shared `reqwest::Client`
//! (connection pool) is the only thing reused across identities.

use bytes::Bytes;
use common::Secret;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, warn};

use crate::classify;
use crate::error::{Error, Result};
use crate::surface::Surface;

/// Raw bytes fetched from an API, with the content type Google reported.
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    surface: Surface,
    http: reqwest::Client,
    base_url: Url,
    access_token: Secret<String>,
}

impl ApiClient {
    pub fn new(
        surface: Surface,
        http: reqwest::Client,
        base_url: &str,
        access_token: Secret<String>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("{surface} base URL {base_url} is invalid: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "{surface} base URL {base_url} cannot carry a path"
            )));
        }
        Ok(Self {
            surface,
            http,
            base_url,
            access_token,
        })
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Build `base/segment/segment?query`. Segments are percent-encoded, so
    /// caller-supplied ids cannot inject extra path components.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                Error::Config(format!("{} base URL cannot carry a path", self.surface))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub async fn get_json(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Value> {
        let url = self.endpoint(segments, query)?;
        let response = self.send(self.http.get(url)).await?;
        read_json(response).await
    }

    pub async fn post_json(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value> {
        let url = self.endpoint(segments, query)?;
        let response = self.send(self.http.post(url).json(body)).await?;
        read_json(response).await
    }

    pub async fn put_json(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value> {
        let url = self.endpoint(segments, query)?;
        let response = self.send(self.http.put(url).json(body)).await?;
        read_json(response).await
    }

    pub async fn delete(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<()> {
        let url = self.endpoint(segments, query)?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    pub async fn get_bytes(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Download> {
        let url = self.endpoint(segments, query)?;
        let response = self.send(self.http.get(url)).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("reading {} response body: {e}", self.surface)))?;
        Ok(Download {
            content_type,
            bytes,
        })
    }

    /// Upload metadata and media in one `multipart/related` request, the
    /// shape Drive and YouTube expect for `uploadType=multipart`.
    pub async fn upload_multipart(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        metadata: &Value,
        media: Bytes,
        media_type: &str,
    ) -> Result<Value> {
        let url = self.endpoint(segments, query)?;
        let boundary = format!("gateway-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, metadata, &media, media_type)?;
        debug!(
            surface = %self.surface,
            media_type,
            media_bytes = media.len(),
            "uploading multipart body"
        );
        let request = self
            .http
            .post(url)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        let response = self.send(request).await?;
        read_json(response).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(self.access_token.expose())
            .send()
            .await
            .map_err(|e| {
                metrics::counter!(
                    "gateway_upstream_errors_total",
                    "surface" => self.surface.label(),
                    "classification" => "transport"
                )
                .increment(1);
                Error::Http(format!("{} request failed: {e}", self.surface))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let classification = classify::classify_status(status.as_u16(), &body);
        metrics::counter!(
            "gateway_upstream_errors_total",
            "surface" => self.surface.label(),
            "classification" => classification.label()
        )
        .increment(1);
        warn!(
            surface = %self.surface,
            status = status.as_u16(),
            classification = classification.label(),
            "upstream API call failed"
        );
        Err(classify::into_error(status.as_u16(), &body))
    }
}

/// Decode a success body. Google answers some calls (clear, delete, update
/// without fields) with an empty body; that decodes to `{}`.
async fn read_json(response: reqwest::Response) -> Result<Value> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Http(format!("reading response body: {e}")))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(&bytes).map_err(|e| Error::InvalidResponse(e.to_string()))
}

fn multipart_related_body(
    boundary: &str,
    metadata: &Value,
    media: &[u8],
    media_type: &str,
) -> Result<Vec<u8>> {
    let metadata = serde_json::to_vec(metadata).map_err(|e| Error::InvalidResponse(e.to_string()))?;
    let mut body = Vec::with_capacity(metadata.len() + media.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(&metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {media_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Ok(body)
}
