//! ConfigMap, Secret and ServiceAccount types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;

/// Kubernetes ConfigMap.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Data
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    /// Base64 encoded binary data
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary_data: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Creates an empty ConfigMap.
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            metadata,
            data: BTreeMap::new(),
            binary_data: BTreeMap::new(),
        }
    }

    /// Adds a data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Adds file content; UTF-8 text goes to `data`, anything else to
    /// `binaryData`.
    #[must_use]
    pub fn with_content(mut self, key: impl Into<String>, bytes: Vec<u8>) -> Self {
        use base64::Engine;
        match String::from_utf8(bytes) {
            Ok(text) => {
                self.data.insert(key.into(), text);
            }
            Err(e) => {
                self.binary_data.insert(
                    key.into(),
                    base64::engine::general_purpose::STANDARD.encode(e.as_bytes()),
                );
            }
        }
        self
    }
}

/// Kubernetes Secret with base64 encoded data.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Secret type
    #[serde(rename = "type")]
    pub type_: String,
    /// Base64 encoded data
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl Secret {
    /// Creates an empty opaque Secret.
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Secret".to_string(),
            metadata,
            type_: "Opaque".to_string(),
            data: BTreeMap::new(),
        }
    }

    /// Adds raw bytes, encoding them as base64.
    #[must_use]
    pub fn with_bytes(mut self, key: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine;
        self.data.insert(
            key.into(),
            base64::engine::general_purpose::STANDARD.encode(bytes),
        );
        self
    }
}

/// Kubernetes ServiceAccount.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
}

impl ServiceAccount {
    /// Creates a ServiceAccount.
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "ServiceAccount".to_string(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_data_is_base64() {
        let secret = Secret::new(ObjectMeta::new("creds", None)).with_bytes("password", b"hunter2");
        assert_eq!(
            secret.data.get("password").map(String::as_str),
            Some("aHVudGVyMg==")
        );
        let json = serde_json::to_value(&secret).unwrap();
        assert_eq!(json["type"], "Opaque");
    }

    #[test]
    fn test_config_map_binary_content() {
        let text = ConfigMap::new(ObjectMeta::new("conf", None)).with_content("app.conf", b"port=80".to_vec());
        assert_eq!(text.data.get("app.conf").map(String::as_str), Some("port=80"));
        assert!(text.binary_data.is_empty());

        let binary =
            ConfigMap::new(ObjectMeta::new("certs", None)).with_content("ks.p12", vec![0xff, 0xfe, 0x00]);
        assert!(binary.data.is_empty());
        assert_eq!(binary.binary_data.get("ks.p12").map(String::as_str), Some("//4A"));
        let json = serde_json::to_value(&binary).unwrap();
        assert_eq!(json["binaryData"]["ks.p12"], "//4A");
    }
}
