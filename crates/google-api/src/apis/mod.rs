//! Typed wrappers, one per surface
//!
//! Each wrapper maps gateway parameters onto one Google REST resource and
//! relays the JSON answer. None of them hold state beyond their `ApiClient`.

mod analytics;
mod docs;
mod drive;
mod sheets;
mod youtube;

pub use analytics::YouTubeAnalyticsApi;
pub use docs::DocsApi;
pub use drive::DriveApi;
pub use sheets::SheetsApi;
pub use youtube::{VideoDetails, VideoListParams, YouTubeApi, split_tags};
