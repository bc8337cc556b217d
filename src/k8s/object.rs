//! The closed set of objects the synthesizer emits.

use serde::Serialize;

use super::autoscaling::HorizontalPodAutoscaler;
use super::config::{ConfigMap, Secret, ServiceAccount};
use super::meta::ObjectMeta;
use super::network::{Ingress, NetworkPolicy, Service};
use super::storage::PersistentVolumeClaim;
use super::workload::Workload;

/// Any emitted Kubernetes object.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum KubernetesObject {
    /// Deployment, StatefulSet, DaemonSet or Job
    Workload(Workload),
    /// Service
    Service(Service),
    /// Ingress
    Ingress(Ingress),
    /// HorizontalPodAutoscaler
    HorizontalPodAutoscaler(HorizontalPodAutoscaler),
    /// NetworkPolicy
    NetworkPolicy(NetworkPolicy),
    /// ConfigMap
    ConfigMap(ConfigMap),
    /// Secret
    Secret(Secret),
    /// PersistentVolumeClaim
    PersistentVolumeClaim(PersistentVolumeClaim),
    /// ServiceAccount
    ServiceAccount(ServiceAccount),
}

impl KubernetesObject {
    /// Returns the object metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Workload(w) => w.metadata(),
            Self::Service(o) => &o.metadata,
            Self::Ingress(o) => &o.metadata,
            Self::HorizontalPodAutoscaler(o) => &o.metadata,
            Self::NetworkPolicy(o) => &o.metadata,
            Self::ConfigMap(o) => &o.metadata,
            Self::Secret(o) => &o.metadata,
            Self::PersistentVolumeClaim(o) => &o.metadata,
            Self::ServiceAccount(o) => &o.metadata,
        }
    }

    /// Returns the kind name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Workload(w) => w.kind(),
            Self::Service(_) => "Service",
            Self::Ingress(_) => "Ingress",
            Self::HorizontalPodAutoscaler(_) => "HorizontalPodAutoscaler",
            Self::NetworkPolicy(_) => "NetworkPolicy",
            Self::ConfigMap(_) => "ConfigMap",
            Self::Secret(_) => "Secret",
            Self::PersistentVolumeClaim(_) => "PersistentVolumeClaim",
            Self::ServiceAccount(_) => "ServiceAccount",
        }
    }

    /// Returns the object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Returns the namespace, empty when unset.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    /// Returns true for Service objects.
    #[must_use]
    pub const fn is_service(&self) -> bool {
        matches!(self, Self::Service(_))
    }

    /// Identity used for deduplication.
    #[must_use]
    pub fn key(&self) -> (&'static str, String, String) {
        (
            self.kind(),
            self.namespace().to_string(),
            self.name().to_string(),
        )
    }
}

impl From<Workload> for KubernetesObject {
    fn from(workload: Workload) -> Self {
        Self::Workload(workload)
    }
}
