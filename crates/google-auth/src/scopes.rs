//! Scope catalog
//!
//! Maps the short feature names the browser asks for (`drive.file`,
//! `sheets.readonly`, ...) to fully-qualified Google scope URIs and merges them
//! with the default scopes into one ordered, de-duplicated request.
//!
//! Unknown feature names are not rejected here: they are expanded under
//! `SCOPE_PREFIX` and Google's consent page rejects anything invalid.

use serde::Serialize;

use crate::constants::{DEFAULT_SCOPES, SCOPE_PREFIX};

/// Feature aliases whose scope name differs from the feature name.
const FEATURE_ALIASES: &[(&str, &str)] = &[
    ("sheets", "spreadsheets"),
    ("sheets.readonly", "spreadsheets.readonly"),
    ("docs", "documents"),
    ("docs.readonly", "documents.readonly"),
    ("youtube.analytics", "yt-analytics.readonly"),
    ("analytics", "yt-analytics.readonly"),
    ("email", "userinfo.email"),
    ("profile", "userinfo.profile"),
];

/// Ordered set of scope URIs. Insertion order is preserved and duplicates are
/// dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScopeSet {
    scopes: Vec<String>,
}

impl ScopeSet {
    /// The default scope list every authorization starts from.
    pub fn defaults() -> Self {
        let mut set = Self::default();
        for scope in DEFAULT_SCOPES {
            set.insert(*scope);
        }
        set
    }

    /// Parse the space-delimited `scope` field of a token response.
    pub fn from_granted(granted: &str) -> Self {
        let mut set = Self::default();
        for scope in granted.split_whitespace() {
            set.insert(scope);
        }
        set
    }

    /// Add a scope unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, scope: impl Into<String>) -> bool {
        let scope = scope.into();
        if self.scopes.contains(&scope) {
            return false;
        }
        self.scopes.push(scope);
        true
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Space-delimited form used in the `scope` query parameter.
    pub fn to_param(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Resolve one feature name to its scope URI.
pub fn resolve_feature(feature: &str) -> String {
    let feature = feature.trim();
    if feature.starts_with("https://") {
        return feature.to_string();
    }
    let name = FEATURE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == feature)
        .map(|(_, scope)| *scope)
        .unwrap_or(feature);
    format!("{SCOPE_PREFIX}{name}")
}

/// Build the scope request for an authorization: defaults first, then each
/// requested feature in order, first occurrence wins.
pub fn build_scopes<S: AsRef<str>>(requested: &[S]) -> ScopeSet {
    let mut set = ScopeSet::defaults();
    for feature in requested {
        let feature = feature.as_ref().trim();
        if feature.is_empty() {
            continue;
        }
        set.insert(resolve_feature(feature));
    }
    set
}

/// Split the comma-separated `scopes` query value into feature names.
pub fn parse_feature_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
