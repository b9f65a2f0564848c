//! Resource routes under `/api`
//!
//! Every route here sits behind `require_auth`. Handlers obtain an
//! identity-bound client from the factory, call one resource operation and
//! relay the upstream JSON.

mod docs;
mod drive;
mod sheets;
mod youtube;

use std::collections::HashMap;

use axum::Router;
use axum::extract::Multipart;
use axum::middleware::from_fn_with_state;
use bytes::Bytes;

use crate::error::{GatewayError, Result};
use crate::gate::require_auth;
use crate::state::AppState;

/// Request body ceiling for upload routes (video files).
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/drive", drive::router())
        .nest("/sheets", sheets::router())
        .nest("/docs", docs::router())
        .nest("/youtube", youtube::router(state.clone()))
        .layer(from_fn_with_state(state, require_auth))
}

/// A file part of a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// A fully-read multipart form: file parts by field name, text parts by
/// field name. A repeated field keeps its last value.
#[derive(Debug, Default)]
pub struct MultipartForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or(FALLBACK_MEDIA_TYPE)
                        .to_string();
                    let bytes = field.bytes().await.map_err(malformed)?;
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let value = field.text().await.map_err(malformed)?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile> {
        self.files
            .remove(name)
            .ok_or_else(|| GatewayError::BadRequest(format!("No {name} file uploaded.")))
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Non-blank text field.
    pub fn required(&self, name: &str) -> Result<&str> {
        self.text(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| GatewayError::BadRequest(format!("Missing required field: {name}")))
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> GatewayError {
    GatewayError::BadRequest(format!("malformed multipart body: {err}"))
}

/// Request builders shared by the route tests.
#[cfg(test)]
pub(crate) mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::header::{CONTENT_TYPE, COOKIE};
    use axum::response::Response;

    use crate::state::AppState;
    use crate::state::tests::session_cookie;

    const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

    pub(crate) fn api_app(state: AppState) -> Router {
        Router::new()
            .nest("/api", super::api_router(state.clone()))
            .with_state(state)
    }

    /// Request from the signed-in session, with an optional JSON body.
    pub(crate) fn signed_in(method: &str, uri: &str, json: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(COOKIE, session_cookie());
        match json {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub(crate) async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub(crate) enum Part<'a> {
        Text(&'a str, &'a str),
        File {
            name: &'a str,
            file_name: &'a str,
            content_type: &'a str,
            bytes: &'a [u8],
        },
    }

    pub(crate) fn multipart_request(uri: &str, cookie: &str, parts: &[Part<'_>]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post(uri)
            .header(COOKIE, cookie)
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn every_surface_is_gated() {
        use crate::state::tests::{start_google, state_at};
        use tower::ServiceExt;

        let google = start_google().await;
        let app = api_app(state_at(&google.base));
        for (method, uri) in [
            ("GET", "/api/drive/files"),
            ("POST", "/api/sheets"),
            ("GET", "/api/docs/d1"),
            ("POST", "/api/youtube/upload"),
            ("GET", "/api/youtube/videos/v1/analyze"),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
        assert!(google.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upstream_scope_error_is_403() {
        use crate::state::tests::sign_in;
        use tower::ServiceExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let upstream = Router::new().fallback(|| async {
            (
                axum::http::StatusCode::FORBIDDEN,
                [(CONTENT_TYPE, "application/json")],
                r#"{"error":{"code":403,"message":"Request had insufficient authentication scopes."}}"#,
            )
        });
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let state = crate::state::tests::state_at(&base);
        sign_in(&state);
        let response = api_app(state)
            .oneshot(signed_in("GET", "/api/drive/files", None))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::FORBIDDEN);
        let json = json_body(response).await;
        assert_eq!(json["error"]["type"], "insufficient_scope");
    }
}
