//! Drive v3 files

use bytes::Bytes;
use serde_json::{Value, json};

use crate::client::{ApiClient, Download};
use crate::error::Result;

/// Fields returned for an uploaded file.
const UPLOAD_FIELDS: &str = "id,name,mimeType,webViewLink";

/// Fields returned for a file listing.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, webViewLink, createdTime)";

pub struct DriveApi {
    client: ApiClient,
}

impl DriveApi {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Create a file named `name` with `content`.
    pub async fn upload(&self, name: &str, mime_type: &str, content: Bytes) -> Result<Value> {
        self.client
            .upload_multipart(
                &["upload", "drive", "v3", "files"],
                &[("uploadType", "multipart"), ("fields", UPLOAD_FIELDS)],
                &json!({ "name": name }),
                content,
                mime_type,
            )
            .await
    }

    /// List files matching the Drive search expression `query` (empty for
    /// all). Returns the `files` array.
    pub async fn list(&self, query: &str, page_size: u32) -> Result<Value> {
        let page_size = page_size.to_string();
        let mut params = vec![("pageSize", page_size.as_str()), ("fields", LIST_FIELDS)];
        if !query.is_empty() {
            params.push(("q", query));
        }
        let mut response = self.client.get_json(&["drive", "v3", "files"], &params).await?;
        Ok(response
            .get_mut("files")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// File content (`alt=media`).
    pub async fn download(&self, file_id: &str) -> Result<Download> {
        self.client
            .get_bytes(&["drive", "v3", "files", file_id], &[("alt", "media")])
            .await
    }

    pub async fn delete(&self, file_id: &str) -> Result<()> {
        self.client
            .delete(&["drive", "v3", "files", file_id], &[])
            .await
    }
}
