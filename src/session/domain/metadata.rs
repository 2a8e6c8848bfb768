//! Flat string metadata attached to sessions and messages.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flat string-to-string metadata map carried by sessions and messages.
///
/// Backends persist this map verbatim alongside the session, which is what
/// makes scope round-tripping possible: whatever the orchestrator writes in
/// here comes back unchanged on later reads.
///
/// # Examples
///
/// ```
/// use gropius::session::domain::SessionMetadata;
///
/// let metadata = SessionMetadata::new()
///     .with_entry("ticket", "GR-42")
///     .with_entry("requested_by", "scheduler");
/// assert_eq!(metadata.get("ticket"), Some("GR-42"));
/// assert_eq!(metadata.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionMetadata(HashMap<String, String>);

impl SessionMetadata {
    /// Creates an empty metadata map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the previous value for the key if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Consuming builder variant of [`Self::insert`].
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Looks up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` when the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns `true` when every entry of `required` is present with an
    /// identical value. Used by adapters to filter session listings.
    #[must_use]
    pub fn contains_all(&self, required: &Self) -> bool {
        required.iter().all(|(key, value)| self.get(key) == Some(value))
    }

    /// Iterates over entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the wrapper and returns the inner map.
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }
}

impl From<HashMap<String, String>> for SessionMetadata {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for SessionMetadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
