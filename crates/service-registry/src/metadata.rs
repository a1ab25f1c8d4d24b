//! Case-insensitive instance metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-to-string metadata whose keys compare case-insensitively.
///
/// The most recent write of a key decides how it is spelled on output.
/// A deserialized map may not spell the same key twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Metadata {
    // folded key -> (key as written, value)
    entries: BTreeMap<String, (String, String)>,
}

fn fold(key: &str) -> String {
    key.to_lowercase()
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&fold(key)).map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&fold(key))
    }

    /// Insert or overwrite a key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        self.entries
            .insert(fold(&key), (key, value.into()))
            .map(|(_, previous)| previous)
    }

    /// Merge `updates` into this map. Keys not named in `updates` are kept.
    pub fn merge<K, V>(&mut self, updates: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in updates {
            self.insert(key, value);
        }
    }

    /// Iterate `(key, value)` pairs ordered by folded key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        metadata.merge(iter);
        metadata
    }
}

impl TryFrom<BTreeMap<String, String>> for Metadata {
    type Error = common::Error;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut metadata = Metadata::new();
        for (key, value) in map {
            if let Some((existing, _)) = metadata.entries.get(&fold(&key)) {
                return Err(common::Error::invalid(format!(
                    "metadata keys '{}' and '{}' differ only in case",
                    existing, key
                )));
            }
            metadata.insert(key, value);
        }
        Ok(metadata)
    }
}

impl From<Metadata> for BTreeMap<String, String> {
    fn from(metadata: Metadata) -> Self {
        metadata.entries.into_values().collect()
    }
}
