//! YouTube Analytics v2 reports

use serde_json::Value;

use crate::client::ApiClient;
use crate::error::Result;

const VIDEO_METRICS: &str = "averageViewDuration,audienceWatchRatio";

pub struct YouTubeAnalyticsApi {
    client: ApiClient,
}

impl YouTubeAnalyticsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Retention metrics for one video on `channel_id` between two
    /// `YYYY-MM-DD` dates (inclusive).
    pub async fn video_report(
        &self,
        channel_id: &str,
        video_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value> {
        let ids = format!("channel=={channel_id}");
        let filters = format!("video=={video_id}");
        self.client
            .get_json(
                &["v2", "reports"],
                &[
                    ("ids", ids.as_str()),
                    ("startDate", start_date),
                    ("endDate", end_date),
                    ("metrics", VIDEO_METRICS),
                    ("dimensions", "video"),
                    ("filters", filters.as_str()),
                ],
            )
            .await
    }
}
