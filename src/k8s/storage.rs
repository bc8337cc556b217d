//! PersistentVolumeClaim type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::meta::{LabelSelector, ObjectMeta};

/// Kubernetes PersistentVolumeClaim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaim {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: PvcSpec,
}

/// PVC spec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PvcSpec {
    /// Access modes
    pub access_modes: Vec<String>,
    /// Requested storage
    pub resources: PvcResources,
    /// Storage class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    /// Volume selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

/// PVC resource requests.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PvcResources {
    /// Requests
    pub requests: BTreeMap<String, String>,
}

impl PersistentVolumeClaim {
    /// Creates a claim for `size` with one access mode.
    pub fn new(metadata: ObjectMeta, access_mode: &str, size: &str) -> Self {
        let mut requests = BTreeMap::new();
        requests.insert("storage".to_string(), size.to_string());
        Self {
            api_version: "v1".to_string(),
            kind: "PersistentVolumeClaim".to_string(),
            metadata,
            spec: PvcSpec {
                access_modes: vec![access_mode.to_string()],
                resources: PvcResources { requests },
                storage_class_name: None,
                selector: None,
            },
        }
    }
}
