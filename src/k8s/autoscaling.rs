//! HorizontalPodAutoscaler (`autoscaling/v2beta2`).

use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;

/// Kubernetes HorizontalPodAutoscaler.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalPodAutoscaler {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: HpaSpec,
}

/// HPA spec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HpaSpec {
    /// Scaled workload
    pub scale_target_ref: CrossVersionObjectReference,
    /// Lower bound
    pub min_replicas: u32,
    /// Upper bound
    pub max_replicas: u32,
    /// Scaling metrics
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricSpec>,
}

/// Reference to the scaled object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CrossVersionObjectReference {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Name
    pub name: String,
}

/// Scaling metric.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricSpec {
    /// `Resource`
    #[serde(rename = "type")]
    pub type_: String,
    /// Resource metric
    pub resource: ResourceMetricSource,
}

/// Resource utilization metric.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceMetricSource {
    /// `cpu` or `memory`
    pub name: String,
    /// Target
    pub target: MetricTarget,
}

/// Metric target.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricTarget {
    /// `Utilization`
    #[serde(rename = "type")]
    pub type_: String,
    /// Percentage of the request
    pub average_utilization: u32,
}

impl MetricSpec {
    /// Average utilization target for a resource.
    pub fn utilization(resource: impl Into<String>, percent: u32) -> Self {
        Self {
            type_: "Resource".to_string(),
            resource: ResourceMetricSource {
                name: resource.into(),
                target: MetricTarget {
                    type_: "Utilization".to_string(),
                    average_utilization: percent,
                },
            },
        }
    }
}

impl HorizontalPodAutoscaler {
    /// Creates an HPA.
    pub fn new(metadata: ObjectMeta, spec: HpaSpec) -> Self {
        Self {
            api_version: "autoscaling/v2beta2".to_string(),
            kind: "HorizontalPodAutoscaler".to_string(),
            metadata,
            spec,
        }
    }
}
