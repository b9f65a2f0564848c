//! Token store
//!
//! Process-wide mapping from identity to the last-granted credential bundle,
//! and the sole answer to "is this identity authenticated". Callers receive
//! it as an injected `Arc<dyn TokenStore>` so the backing can change without
//! touching call sites.
//!
//! Every operation is synchronous and holds the lock only for a map access,
//! so no request task can observe a half-written bundle. `put` replaces the
//! whole bundle (last writer wins, no field merge).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use common::{IdentityKey, Secret};
use tracing::debug;

use crate::scopes::ScopeSet;
use crate::token::TokenResponse;

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Credentials granted to one identity.
///
/// `expires_at` is an absolute unix timestamp in milliseconds, computed from
/// the token endpoint's `expires_in` delta when the bundle is created.
#[derive(Debug, Clone)]
pub struct CredentialBundle {
    pub access_token: Secret<String>,
    pub refresh_token: Option<Secret<String>>,
    pub expires_at: u64,
    pub scopes: ScopeSet,
}

impl CredentialBundle {
    /// Build a bundle from a token endpoint response received at `now_millis`.
    pub fn from_token_response(response: TokenResponse, now_millis: u64) -> Self {
        Self {
            access_token: Secret::new(response.access_token),
            refresh_token: response.refresh_token.map(Secret::new),
            expires_at: now_millis.saturating_add(response.expires_in.saturating_mul(1000)),
            scopes: response
                .scope
                .as_deref()
                .map(ScopeSet::from_granted)
                .unwrap_or_default(),
        }
    }

    /// Build the bundle that replaces `self` after a refresh. Google usually
    /// omits the refresh token and sometimes the scope list on refresh; the
    /// previous values carry over in that case.
    pub fn refreshed(&self, response: TokenResponse, now_millis: u64) -> Self {
        let mut next = Self::from_token_response(response, now_millis);
        if next.refresh_token.is_none() {
            next.refresh_token = self.refresh_token.clone();
        }
        if next.scopes.is_empty() {
            next.scopes = self.scopes.clone();
        }
        next
    }

    pub fn is_expired(&self, now_millis: u64) -> bool {
        self.expires_at <= now_millis
    }

    pub fn expires_within(&self, threshold_millis: u64, now_millis: u64) -> bool {
        self.expires_at <= now_millis.saturating_add(threshold_millis)
    }
}

/// Key-value contract for credential custody.
pub trait TokenStore: Send + Sync {
    /// Store `bundle` for `key`, replacing any previous bundle.
    fn put(&self, key: IdentityKey, bundle: CredentialBundle);

    /// Snapshot of the bundle for `key`.
    fn get(&self, key: &IdentityKey) -> Option<CredentialBundle>;

    fn has(&self, key: &IdentityKey) -> bool {
        self.get(key).is_some()
    }

    /// Drop the bundle for `key` (logout, rejected refresh).
    fn remove(&self, key: &IdentityKey) -> Option<CredentialBundle>;

    /// Number of identities holding a bundle.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory token store for a single process. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    state: RwLock<HashMap<IdentityKey, CredentialBundle>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn put(&self, key: IdentityKey, bundle: CredentialBundle) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        debug!(identity = %key, expires_at = bundle.expires_at, "stored credential bundle");
        state.insert(key, bundle);
    }

    fn get(&self, key: &IdentityKey) -> Option<CredentialBundle> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.get(key).cloned()
    }

    fn has(&self, key: &IdentityKey) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.contains_key(key)
    }

    fn remove(&self, key: &IdentityKey) -> Option<CredentialBundle> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let removed = state.remove(key);
        if removed.is_some() {
            debug!(identity = %key, "removed credential bundle");
        }
        removed
    }

    fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.len()
    }
}
