//! Typed Kubernetes objects.
//!
//! Hand-written serde models covering the subset of the Kubernetes API the
//! synthesizer emits. Field names serialize in camelCase and unset optional
//! fields are omitted, so the YAML output stays minimal.

mod autoscaling;
mod config;
mod meta;
mod network;
mod object;
mod pod;
mod storage;
mod workload;

pub use autoscaling::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HpaSpec, MetricSpec, MetricTarget,
    ResourceMetricSource,
};
pub use config::{ConfigMap, Secret, ServiceAccount};
pub use meta::{LabelSelector, LocalObjectReference, ObjectMeta, normalize_name};
pub use network::{
    HttpIngressPath, HttpIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTls, NetworkPolicy, NetworkPolicyIngressRule,
    NetworkPolicyPeer, NetworkPolicySpec, Service, ServiceBackendPort, ServicePort, ServiceSpec,
};
pub use object::KubernetesObject;
pub use pod::{
    Capabilities, ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource,
    EnvVar, EnvVarSource, ExecAction, FieldSelector, HostPathVolumeSource, HttpGetAction,
    KeySelector, KeyToPath, PodMeta, PodSecurityContext, PodSpec, PodTemplateSpec, Probe,
    PvcVolumeSource, ResourceFieldSelector, ResourceRequirements, SecretVolumeSource,
    SecurityContext, TcpSocketAction, Volume, VolumeMount,
};
pub use storage::{PersistentVolumeClaim, PvcResources, PvcSpec};
pub use workload::{
    DaemonSet, DaemonSetSpec, Deployment, DeploymentSpec, DeploymentStrategy, Job, JobSpec,
    RollingUpdate, StatefulSet, StatefulSetSpec, StatefulSetUpdateStrategy, Workload,
};

/// Label selecting the pods of one service.
pub const LABEL_SERVICE: &str = "kubecompose.io/service";
/// Prefix of the per-network pod label.
pub const NETWORK_LABEL_PREFIX: &str = "kubecompose.io/network-";
/// Pod annotation carrying the checksum of mounted configuration.
pub const ANNOTATION_CONFIG_HASH: &str = "kubecompose.io/config-hash";
/// Standard managed-by label.
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
/// Value of the managed-by label.
pub const MANAGED_BY_VALUE: &str = "kubecompose";

/// Returns the pod label marking membership of a network.
#[must_use]
pub fn network_label(network: &str) -> String {
    format!("{NETWORK_LABEL_PREFIX}{}", normalize_name(network))
}
