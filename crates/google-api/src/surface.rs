//! API surfaces and their base URLs

use std::fmt;

use serde::Deserialize;

/// One Google API family, each with its own typed client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Drive,
    Sheets,
    Docs,
    YouTubeData,
    YouTubeAnalytics,
}

impl Surface {
    pub const ALL: [Surface; 5] = [
        Surface::Drive,
        Surface::Sheets,
        Surface::Docs,
        Surface::YouTubeData,
        Surface::YouTubeAnalytics,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Surface::Drive => "drive",
            Surface::Sheets => "sheets",
            Surface::Docs => "docs",
            Surface::YouTubeData => "youtube",
            Surface::YouTubeAnalytics => "youtube_analytics",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Base URL per surface. Defaults are Google's production hosts; tests and
/// staging point them elsewhere.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEndpoints {
    #[serde(default = "default_googleapis")]
    pub drive: String,
    #[serde(default = "default_sheets")]
    pub sheets: String,
    #[serde(default = "default_docs")]
    pub docs: String,
    #[serde(default = "default_googleapis")]
    pub youtube: String,
    #[serde(default = "default_youtube_analytics")]
    pub youtube_analytics: String,
}

fn default_googleapis() -> String {
    "https://www.googleapis.com".into()
}

fn default_sheets() -> String {
    "https://sheets.googleapis.com".into()
}

fn default_docs() -> String {
    "https://docs.googleapis.com".into()
}

fn default_youtube_analytics() -> String {
    "https://youtubeanalytics.googleapis.com".into()
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            drive: default_googleapis(),
            sheets: default_sheets(),
            docs: default_docs(),
            youtube: default_googleapis(),
            youtube_analytics: default_youtube_analytics(),
        }
    }
}

impl ApiEndpoints {
    /// Every surface served from one base URL (mock upstreams).
    pub fn all_at(base: &str) -> Self {
        Self {
            drive: base.into(),
            sheets: base.into(),
            docs: base.into(),
            youtube: base.into(),
            youtube_analytics: base.into(),
        }
    }

    pub fn base_for(&self, surface: Surface) -> &str {
        match surface {
            Surface::Drive => &self.drive,
            Surface::Sheets => &self.sheets,
            Surface::Docs => &self.docs,
            Surface::YouTubeData => &self.youtube,
            Surface::YouTubeAnalytics => &self.youtube_analytics,
        }
    }
}
