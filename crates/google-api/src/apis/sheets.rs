//! Sheets v4 spreadsheets and value ranges

use serde_json::{Value, json};

use crate::client::ApiClient;
use crate::error::Result;

/// Values are parsed as if typed into the UI (formulas, dates).
const VALUE_INPUT_OPTION: (&str, &str) = ("valueInputOption", "USER_ENTERED");

pub struct SheetsApi {
    client: ApiClient,
}

impl SheetsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, title: &str) -> Result<Value> {
        self.client
            .post_json(
                &["v4", "spreadsheets"],
                &[],
                &json!({ "properties": { "title": title } }),
            )
            .await
    }

    pub async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Value> {
        self.client
            .get_json(&["v4", "spreadsheets", spreadsheet_id, "values", range], &[])
            .await
    }

    /// Append `values` (rows of cells) after the table found in `range`.
    pub async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Value,
    ) -> Result<Value> {
        let target = format!("{range}:append");
        self.client
            .post_json(
                &["v4", "spreadsheets", spreadsheet_id, "values", &target],
                &[VALUE_INPUT_OPTION],
                &json!({ "values": values }),
            )
            .await
    }

    /// Overwrite `range` with `values`.
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Value,
    ) -> Result<Value> {
        self.client
            .put_json(
                &["v4", "spreadsheets", spreadsheet_id, "values", range],
                &[VALUE_INPUT_OPTION],
                &json!({ "range": range, "values": values }),
            )
            .await
    }

    pub async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<Value> {
        let target = format!("{range}:clear");
        self.client
            .post_json(
                &["v4", "spreadsheets", spreadsheet_id, "values", &target],
                &[],
                &json!({}),
            )
            .await
    }
}
