//! Fixed-window limiter state machine
//!
//! Per identity: `{window_start, count}`. State is created lazily on the first
//! request and lives as long as the process (no eviction).
//!
//! `admit` is synchronous. The whole read-modify-write for one identity runs
//! under a single lock acquisition, so concurrent requests for the same
//! identity can never both take the last slot.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use common::IdentityKey;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Window bookkeeping for one identity.
#[derive(Debug, Clone, Copy)]
pub struct WindowState {
    pub window_start: Instant,
    pub count: u32,
}

/// Fixed-window counter keyed by identity.
///
/// Uses `tokio::time::Instant`, so tests can drive expiry with a paused clock.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    state: Mutex<HashMap<IdentityKey, WindowState>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        debug!(
            window_secs = window.as_secs(),
            max_requests, "rate limiter initialized"
        );
        Self {
            window,
            max_requests,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Admit or refuse one request for `key`. A refused request changes no
    /// state.
    pub fn admit(&self, key: &IdentityKey) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = state.entry(key.clone()).or_insert(WindowState {
            window_start: now,
            count: 0,
        });

        if now.duration_since(entry.window_start) > self.window {
            entry.window_start = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            warn!(identity = %key, max_requests = self.max_requests, "rate limit exceeded");
            metrics::counter!("gateway_rate_limited_total").increment(1);
            return false;
        }

        entry.count += 1;
        true
    }

    /// Snapshot of the window for `key`, if one was ever created.
    pub fn state_for(&self, key: &IdentityKey) -> Option<WindowState> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.get(key).copied()
    }

    /// Number of identities with window state.
    pub fn tracked_identities(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
