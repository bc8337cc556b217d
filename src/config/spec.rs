//! Override document types.
//!
//! This module defines the structs that map to the `x-k8s` extension found
//! at project level, on services and on named volumes. Every field is
//! optional so documents from different sources can be layered on top of
//! each other before validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::compose::de;

/// Root of an `x-k8s` override document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct K8sOverride {
    /// Skip the service entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    /// Workload settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub workload: Option<WorkloadOverride>,
    /// Service (networking) settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub service: Option<ServiceOverride>,
}

/// Workload section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkloadOverride {
    /// `Deployment`, `StatefulSet`, `DaemonSet` or `Job`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Desired replica count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    /// `Always`, `OnFailure` or `Never`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<String>,
    /// Service account the pods run as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    /// Container command override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Container arguments override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_args: Option<Vec<String>>,
    /// Workload annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    /// Image pull settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull: Option<ImagePullOverride>,
    /// Pod security context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security: Option<PodSecurityOverride>,
    /// Rolling update strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdateOverride>,
    /// Liveness probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub liveness_probe: Option<ProbeOverride>,
    /// Readiness probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub readiness_probe: Option<ProbeOverride>,
    /// Resource requests and limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesOverride>,
    /// Autoscaling thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub autoscale: Option<AutoscaleOverride>,
}

/// Image pull settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImagePullOverride {
    /// `Always`, `IfNotPresent` or `Never`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Name of the registry credentials secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Pod security context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PodSecurityOverride {
    /// UID the containers run as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,
    /// GID the containers run as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_group: Option<i64>,
    /// Supplemental group owning mounted volumes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_group: Option<i64>,
}

/// Rolling update strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RollingUpdateOverride {
    /// Pods created above the desired count during an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<u32>,
    /// Pods allowed to be unavailable during an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<u32>,
}

/// Probe settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProbeOverride {
    /// `exec`, `http`, `tcp` or `none`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Exec action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecProbeOverride>,
    /// HTTP GET action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpProbeOverride>,
    /// TCP socket action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TcpProbeOverride>,
    /// Delay before the first check.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_delay: Option<String>,
    /// Interval between checks.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub period: Option<String>,
    /// Timeout per check.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<String>,
    /// Consecutive failures before the probe fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub failure_threshold: Option<u32>,
    /// Consecutive successes before the probe passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub success_threshold: Option<u32>,
}

/// Exec probe action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExecProbeOverride {
    /// Command run inside the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

/// HTTP probe action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HttpProbeOverride {
    /// Request path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Container port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// TCP probe action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TcpProbeOverride {
    /// Container port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Resource requests and limits, as quantities.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourcesOverride {
    /// Memory request.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub memory: Option<String>,
    /// Memory limit.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_memory: Option<String>,
    /// CPU request.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub cpu: Option<String>,
    /// CPU limit.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_cpu: Option<String>,
    /// Ephemeral storage request.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage: Option<String>,
    /// Ephemeral storage limit.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_storage: Option<String>,
}

/// Autoscaling thresholds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AutoscaleOverride {
    /// Upper replica bound; `0` disables autoscaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<u32>,
    /// Target CPU utilization percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 100))]
    pub cpu_threshold: Option<u32>,
    /// Target memory utilization percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 100))]
    pub mem_threshold: Option<u32>,
}

/// Service (networking) section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceOverride {
    /// `None`, `ClusterIP`, `NodePort`, `LoadBalancer` or `Headless`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Fixed node port.
    #[serde(
        rename = "nodeport",
        alias = "nodePort",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(range(min = 30000, max = 32767))]
    pub node_port: Option<u16>,
    /// Ingress exposure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<ExposeOverride>,
}

/// Ingress exposure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExposeOverride {
    /// Comma separated host names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// TLS secret name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret: Option<String>,
    /// Extra ingress annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_annotations: Option<BTreeMap<String, String>>,
}

/// Storage override on a top-level named volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeOverride {
    /// Storage class of the claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// Requested size.
    #[serde(
        default,
        deserialize_with = "de::optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<String>,
    /// Label selector, `key=value[,key=value]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_override() {
        let yaml = r#"
disabled: false
workload:
  type: StatefulSet
  replicas: 3
  livenessProbe:
    type: http
    http:
      path: /health
      port: 8080
    period: 10s
  resources:
    cpu: 0.25
    maxMemory: 512Mi
  autoscale:
    maxReplicas: 6
service:
  type: NodePort
  nodeport: 30080
  expose:
    domain: a.com,b.com
"#;
        let doc: K8sOverride = serde_yaml::from_str(yaml).unwrap();
        let workload = doc.workload.as_ref().unwrap();
        assert_eq!(workload.kind.as_deref(), Some("StatefulSet"));
        assert_eq!(
            workload.resources.as_ref().unwrap().cpu.as_deref(),
            Some("0.25")
        );
        assert_eq!(doc.service.as_ref().unwrap().node_port, Some(30080));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<K8sOverride, _> = serde_yaml::from_str("workload:\n  replica: 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_threshold_range() {
        let doc = K8sOverride {
            workload: Some(WorkloadOverride {
                autoscale: Some(AutoscaleOverride {
                    max_replicas: Some(4),
                    cpu_threshold: Some(150),
                    mem_threshold: None,
                }),
                ..WorkloadOverride::default()
            }),
            ..K8sOverride::default()
        };
        assert!(doc.validate().is_err());
    }
}
