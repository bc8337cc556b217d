//! Serde helpers for the loose syntaxes Compose allows.
//!
//! Compose accepts the same setting in several shapes (a string or a list,
//! a map or a list of `KEY=VALUE`, a number or a string). These helpers fold
//! those shapes into one Rust representation.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// A value written either as a single string or as a list of strings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    /// Single string, split on whitespace when a list is needed.
    String(String),
    /// Explicit list.
    List(Vec<String>),
}

impl StringOrList {
    /// Returns the value as a list of words.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::String(s) => s.split_whitespace().map(str::to_string).collect(),
            Self::List(items) => items.clone(),
        }
    }
}

/// Converts a scalar YAML value into its string form.
#[must_use]
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Deserializes an optional scalar (string, number or bool) as a string.
///
/// # Errors
///
/// Returns an error if the value is a sequence or a mapping.
pub fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => scalar_to_string(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a scalar value")),
    }
}

/// Deserializes a map whose values may be `null` into a map of defaults.
///
/// Compose allows `volumes: { data: }` where the declaration body is empty.
///
/// # Errors
///
/// Returns an error if a non-null value fails to deserialize.
pub fn map_with_null_values<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let map = Option::<BTreeMap<String, Option<T>>>::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect())
}

/// Splits a `KEY=VALUE` list entry. A bare `KEY` yields no value.
#[must_use]
pub fn split_assignment(entry: &str) -> (String, Option<String>) {
    match entry.split_once('=') {
        Some((key, value)) => (key.trim().to_string(), Some(value.to_string())),
        None => (entry.trim().to_string(), None),
    }
}

/// Reads a mapping or a `KEY=VALUE` list into ordered pairs.
///
/// # Errors
///
/// Returns the offending entry when it is neither a scalar nor a pair.
pub fn ordered_pairs(value: &Value) -> Result<Vec<(String, Option<String>)>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(mapping) => mapping
            .iter()
            .map(|(k, v)| {
                let key = scalar_to_string(k).ok_or_else(|| format!("{k:?}"))?;
                match v {
                    Value::Null => Ok((key, None)),
                    other => scalar_to_string(other)
                        .map(|s| (key.clone(), Some(s)))
                        .ok_or_else(|| format!("{key}: {other:?}")),
                }
            })
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                scalar_to_string(item)
                    .map(|s| split_assignment(&s))
                    .ok_or_else(|| format!("{item:?}"))
            })
            .collect(),
        other => Err(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_or_list() {
        let single: StringOrList = serde_yaml::from_str("\"npm run start\"").unwrap();
        assert_eq!(single.to_vec(), vec!["npm", "run", "start"]);

        let list: StringOrList = serde_yaml::from_str("[\"sh\", \"-c\", \"echo hi\"]").unwrap();
        assert_eq!(list.to_vec(), vec!["sh", "-c", "echo hi"]);
    }

    #[test]
    fn test_ordered_pairs_preserve_map_order() {
        let value: Value = serde_yaml::from_str("ZED: 1\nALPHA: two\nEMPTY:\n").unwrap();
        let pairs = ordered_pairs(&value).unwrap();
        assert_eq!(
            pairs,
            vec![
                (String::from("ZED"), Some(String::from("1"))),
                (String::from("ALPHA"), Some(String::from("two"))),
                (String::from("EMPTY"), None),
            ]
        );
    }

    #[test]
    fn test_ordered_pairs_from_list() {
        let value: Value = serde_yaml::from_str("[\"A=1\", \"B\", \"C=x=y\"]").unwrap();
        let pairs = ordered_pairs(&value).unwrap();
        assert_eq!(pairs[0], (String::from("A"), Some(String::from("1"))));
        assert_eq!(pairs[1], (String::from("B"), None));
        assert_eq!(pairs[2], (String::from("C"), Some(String::from("x=y"))));
    }
}
