//! Canonical per-service configuration produced by the resolver.
//!
//! Every field carries a concrete value; fields that are optional by nature
//! (pull secret, exposure, probes) are deterministically `None` when unset.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Kind of the primary workload object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum WorkloadKind {
    /// `apps/v1` Deployment.
    #[default]
    Deployment,
    /// `apps/v1` StatefulSet.
    StatefulSet,
    /// `apps/v1` DaemonSet.
    DaemonSet,
    /// `batch/v1` Job.
    Job,
}

impl WorkloadKind {
    /// Parses a workload type, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "deployment" => Some(Self::Deployment),
            "statefulset" => Some(Self::StatefulSet),
            "daemonset" => Some(Self::DaemonSet),
            "job" => Some(Self::Job),
            _ => None,
        }
    }

    /// Returns the Kubernetes kind name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Job => "Job",
        }
    }
}

/// Kind of Service fronting the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum ServiceType {
    /// No Service is emitted.
    #[default]
    None,
    /// Cluster-internal virtual IP.
    ClusterIp,
    /// Exposed on every node.
    NodePort,
    /// Cloud load balancer.
    LoadBalancer,
    /// No cluster IP; pods resolved directly through DNS.
    Headless,
}

impl ServiceType {
    /// Parses a service type, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "clusterip" => Some(Self::ClusterIp),
            "nodeport" => Some(Self::NodePort),
            "loadbalancer" => Some(Self::LoadBalancer),
            "headless" => Some(Self::Headless),
            _ => None,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::ClusterIp => "ClusterIP",
            Self::NodePort => "NodePort",
            Self::LoadBalancer => "LoadBalancer",
            Self::Headless => "Headless",
        }
    }
}

/// Pod restart policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum RestartPolicy {
    /// Always restart.
    #[default]
    Always,
    /// Restart on non-zero exit.
    OnFailure,
    /// Never restart.
    Never,
}

impl RestartPolicy {
    /// Parses a restart policy, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Some(Self::Always),
            "onfailure" => Some(Self::OnFailure),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    /// Returns the Kubernetes spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::OnFailure => "OnFailure",
            Self::Never => "Never",
        }
    }
}

/// Container image pull policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum ImagePullPolicy {
    /// Pull on every start.
    Always,
    /// Pull only when absent from the node.
    #[default]
    IfNotPresent,
    /// Never pull.
    Never,
}

impl ImagePullPolicy {
    /// Parses a pull policy, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Some(Self::Always),
            "ifnotpresent" => Some(Self::IfNotPresent),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    /// Returns the Kubernetes spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::IfNotPresent => "IfNotPresent",
            Self::Never => "Never",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(WorkloadKind, ServiceType, RestartPolicy, ImagePullPolicy);

/// What a probe checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProbeAction {
    /// Run a command in the container.
    Exec {
        /// Command and arguments.
        command: Vec<String>,
    },
    /// HTTP GET against the container.
    Http {
        /// Request path.
        path: String,
        /// Container port.
        port: u16,
    },
    /// TCP connect to the container.
    Tcp {
        /// Container port.
        port: u16,
    },
}

/// A resolved probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeConfig {
    /// Probe action.
    pub action: ProbeAction,
    /// Seconds before the first check.
    pub initial_delay_secs: Option<u64>,
    /// Seconds between checks.
    pub period_secs: Option<u64>,
    /// Seconds before a check times out.
    pub timeout_secs: Option<u64>,
    /// Failures before the probe is considered failed.
    pub failure_threshold: Option<u32>,
    /// Successes before the probe is considered passed.
    pub success_threshold: Option<u32>,
}

/// Resource requests and limits. CPU in millicores, memory and storage in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceConfig {
    /// Memory request.
    pub memory_request: Option<u64>,
    /// Memory limit.
    pub memory_limit: Option<u64>,
    /// CPU request.
    pub cpu_request: Option<u64>,
    /// CPU limit.
    pub cpu_limit: Option<u64>,
    /// Ephemeral storage request.
    pub storage_request: Option<u64>,
    /// Ephemeral storage limit.
    pub storage_limit: Option<u64>,
}

/// Horizontal autoscaling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoscaleConfig {
    /// Upper replica bound; `0` disables autoscaling.
    pub max_replicas: u32,
    /// Target CPU utilization percentage.
    pub cpu_threshold: u32,
    /// Target memory utilization percentage.
    pub mem_threshold: u32,
}

/// Rolling update strategy parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RollingUpdateConfig {
    /// Extra pods allowed during an update.
    pub max_surge: Option<u32>,
    /// Pods allowed to be unavailable during an update.
    pub max_unavailable: Option<u32>,
}

/// Pod-level security context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PodSecurityConfig {
    /// UID.
    pub run_as_user: Option<i64>,
    /// GID.
    pub run_as_group: Option<i64>,
    /// Volume group.
    pub fs_group: Option<i64>,
}

impl PodSecurityConfig {
    /// Returns true if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.run_as_user.is_none() && self.run_as_group.is_none() && self.fs_group.is_none()
    }
}

/// Ingress exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExposureConfig {
    /// Host names, in declaration order.
    pub domains: Vec<String>,
    /// TLS secret name.
    pub tls_secret: Option<String>,
    /// Extra ingress annotations.
    pub ingress_annotations: BTreeMap<String, String>,
}

/// Resolved workload section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedWorkload {
    /// Workload kind.
    pub kind: WorkloadKind,
    /// Desired replicas.
    pub replicas: u32,
    /// Pod restart policy.
    pub restart_policy: RestartPolicy,
    /// Service account name.
    pub service_account_name: String,
    /// Image pull policy.
    pub image_pull_policy: ImagePullPolicy,
    /// Registry credentials secret.
    pub image_pull_secret: Option<String>,
    /// Command override.
    pub command: Option<Vec<String>>,
    /// Arguments override.
    pub command_args: Option<Vec<String>>,
    /// Workload annotations.
    pub annotations: BTreeMap<String, String>,
    /// Pod security context.
    pub pod_security: PodSecurityConfig,
    /// Rolling update strategy; `None` means the cluster default.
    pub rolling_update: Option<RollingUpdateConfig>,
    /// Liveness probe.
    pub liveness_probe: Option<ProbeConfig>,
    /// Readiness probe.
    pub readiness_probe: Option<ProbeConfig>,
    /// Requests and limits.
    pub resources: ResourceConfig,
    /// Autoscaling.
    pub autoscale: AutoscaleConfig,
}

/// Resolved service (networking) section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedService {
    /// Service type.
    pub kind: ServiceType,
    /// Fixed node port.
    pub node_port: Option<u16>,
    /// Ingress exposure.
    pub expose: Option<ExposureConfig>,
}

/// Fully resolved configuration of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedServiceConfig {
    /// Service is skipped entirely.
    pub disabled: bool,
    /// Workload settings.
    pub workload: ResolvedWorkload,
    /// Networking settings.
    pub service: ResolvedService,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parse_ignores_case() {
        assert_eq!(WorkloadKind::parse("statefulset"), Some(WorkloadKind::StatefulSet));
        assert_eq!(ServiceType::parse("ClusterIP"), Some(ServiceType::ClusterIp));
        assert_eq!(ServiceType::parse("nodeport"), Some(ServiceType::NodePort));
        assert_eq!(RestartPolicy::parse("ONFAILURE"), Some(RestartPolicy::OnFailure));
        assert_eq!(ImagePullPolicy::parse("ifnotpresent"), Some(ImagePullPolicy::IfNotPresent));
        assert_eq!(WorkloadKind::parse("CronJob"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkloadKind::DaemonSet.to_string(), "DaemonSet");
        assert_eq!(ServiceType::ClusterIp.to_string(), "ClusterIP");
    }
}
