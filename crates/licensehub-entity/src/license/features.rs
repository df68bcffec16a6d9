//! Feature flags attached to a license.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A feature entry: a flag, a nested group, or any other JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// On/off switch.
    Flag(bool),
    /// Group of sub-features.
    Nested(FeatureSet),
    /// Numbers, strings and arrays are carried through untouched.
    Other(serde_json::Value),
}

/// Mapping from feature names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeMap<String, FeatureValue>);

impl FeatureSet {
    /// Creates an empty feature set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets a feature, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: FeatureValue) -> Option<FeatureValue> {
        self.0.insert(name.into(), value)
    }

    /// Looks up a feature.
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    /// Whether `name` is present and switched on.
    ///
    /// Dotted names walk nested groups: `"export.pdf"`.
    pub fn is_enabled(&self, name: &str) -> bool {
        let mut parts = name.splitn(2, '.');
        let head = parts.next().unwrap_or_default();
        match (self.0.get(head), parts.next()) {
            (Some(FeatureValue::Flag(on)), None) => *on,
            (Some(FeatureValue::Nested(inner)), Some(rest)) => inner.is_enabled(rest),
            _ => false,
        }
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no features.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FeatureValue)> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
