//! Delegated Google API access
//!
//! `ClientFactory` turns an identity into an `ApiClient` bound to one API
//! surface, carrying a snapshot of that identity's current access token. The
//! typed wrappers under `apis` are thin parameter mappings over `ApiClient`.
//!
//! Upstream failures are classified so the gateway can tell "sign in again"
//! (401), "grant more scope" (403) and "slow down" (429) apart from generic
//! upstream errors.

pub mod apis;
pub mod classify;
pub mod client;
pub mod error;
pub mod factory;
pub mod surface;

pub use apis::{
    DocsApi, DriveApi, SheetsApi, VideoDetails, VideoListParams, YouTubeAnalyticsApi, YouTubeApi,
    split_tags,
};
pub use classify::{ErrorClassification, classify_status, extract_error_message};
pub use client::{ApiClient, Download};
pub use error::{Error, Result};
pub use factory::ClientFactory;
pub use surface::{ApiEndpoints, Surface};
