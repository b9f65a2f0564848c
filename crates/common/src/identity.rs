//! Caller identity used to partition credentials and rate-limit counters

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key identifying one authenticated caller.
///
/// The gateway derives it from a server-issued session cookie. Every store
/// that holds per-caller state (tokens, rate-limit windows) is indexed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IdentityKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}
