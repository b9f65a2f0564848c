//! Docs v1 documents

use serde_json::{Value, json};

use crate::client::ApiClient;
use crate::error::Result;

pub struct DocsApi {
    client: ApiClient,
}

impl DocsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, title: &str) -> Result<Value> {
        self.client
            .post_json(&["v1", "documents"], &[], &json!({ "title": title }))
            .await
    }

    pub async fn get(&self, document_id: &str) -> Result<Value> {
        self.client
            .get_json(&["v1", "documents", document_id], &[])
            .await
    }

    /// Apply `requests` (a JSON array of Docs update requests) atomically.
    pub async fn batch_update(&self, document_id: &str, requests: Value) -> Result<Value> {
        let target = format!("{document_id}:batchUpdate");
        self.client
            .post_json(
                &["v1", "documents", &target],
                &[],
                &json!({ "requests": requests }),
            )
            .await
    }
}
