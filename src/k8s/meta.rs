//! Object metadata and naming helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{LABEL_MANAGED_BY, MANAGED_BY_VALUE};

/// Standard object metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name
    pub name: String,
    /// Object namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Creates metadata carrying the managed-by label.
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            labels,
            annotations: BTreeMap::new(),
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds annotations.
    #[must_use]
    pub fn with_annotations(mut self, annotations: &BTreeMap<String, String>) -> Self {
        self.annotations
            .extend(annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// Label selector with exact matches only.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Labels to match
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Selector matching one label.
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut match_labels = BTreeMap::new();
        match_labels.insert(key.into(), value.into());
        Self { match_labels }
    }
}

/// Reference to an object in the same namespace.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalObjectReference {
    /// Object name
    pub name: String,
}

/// Turns an arbitrary name into a DNS-1123 label.
///
/// Lowercases, replaces unsupported characters with `-`, trims leading and
/// trailing hyphens and truncates to 63 characters.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut normalized = mapped.trim_matches('-').to_string();
    if normalized.len() > 63 {
        normalized.truncate(63);
        normalized = normalized.trim_end_matches('-').to_string();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("web"), "web");
        assert_eq!(normalize_name("My_Service.v2"), "my-service-v2");
        assert_eq!(normalize_name("__db__"), "db");
        assert_eq!(normalize_name(&"x".repeat(70)).len(), 63);
        assert_eq!(normalize_name("___"), "");
    }

    #[test]
    fn test_object_meta_labels() {
        let meta = ObjectMeta::new("web", Some("prod")).with_label("tier", "front");
        assert_eq!(meta.namespace.as_deref(), Some("prod"));
        assert_eq!(meta.labels.get("tier").map(String::as_str), Some("front"));
        assert_eq!(
            meta.labels.get(LABEL_MANAGED_BY).map(String::as_str),
            Some(MANAGED_BY_VALUE)
        );
    }
}
