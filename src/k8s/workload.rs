//! Workload kinds: Deployment, StatefulSet, DaemonSet and Job.
//!
//! [`Workload`] is the closed set of pod-running objects. Code that needs to
//! patch the shared pod template goes through [`Workload::pod_template_mut`]
//! instead of inspecting each kind.

use serde::{Deserialize, Serialize};

use super::meta::{LabelSelector, ObjectMeta};
use super::pod::PodTemplateSpec;

// =============================================================================
// Deployment
// =============================================================================

/// Kubernetes Deployment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: DeploymentSpec,
}

/// Deployment spec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Replicas
    pub replicas: u32,
    /// Selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
    /// Update strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DeploymentStrategy>,
}

/// Deployment update strategy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStrategy {
    /// `RollingUpdate`
    #[serde(rename = "type")]
    pub type_: String,
    /// Rolling update parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdate>,
}

/// Rolling update parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpdate {
    /// Extra pods during the update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<u32>,
    /// Unavailable pods during the update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<u32>,
}

impl Deployment {
    /// Creates a Deployment.
    pub fn new(metadata: ObjectMeta, spec: DeploymentSpec) -> Self {
        Self {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            metadata,
            spec,
        }
    }
}

// =============================================================================
// StatefulSet
// =============================================================================

/// Kubernetes StatefulSet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSet {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: StatefulSetSpec,
}

/// StatefulSet spec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetSpec {
    /// Replicas
    pub replicas: u32,
    /// Governing Service
    pub service_name: String,
    /// Selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
    /// Update strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<StatefulSetUpdateStrategy>,
}

/// StatefulSet update strategy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetUpdateStrategy {
    /// `RollingUpdate`
    #[serde(rename = "type")]
    pub type_: String,
    /// Rolling update parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdate>,
}

impl StatefulSet {
    /// Creates a StatefulSet.
    pub fn new(metadata: ObjectMeta, spec: StatefulSetSpec) -> Self {
        Self {
            api_version: "apps/v1".to_string(),
            kind: "StatefulSet".to_string(),
            metadata,
            spec,
        }
    }
}

// =============================================================================
// DaemonSet
// =============================================================================

/// Kubernetes DaemonSet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSet {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: DaemonSetSpec,
}

/// DaemonSet spec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSetSpec {
    /// Selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
}

impl DaemonSet {
    /// Creates a DaemonSet.
    pub fn new(metadata: ObjectMeta, spec: DaemonSetSpec) -> Self {
        Self {
            api_version: "apps/v1".to_string(),
            kind: "DaemonSet".to_string(),
            metadata,
            spec,
        }
    }
}

// =============================================================================
// Job
// =============================================================================

/// Kubernetes Job.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: JobSpec,
}

/// Job spec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Pods running at once
    pub parallelism: u32,
    /// Successful pods required
    pub completions: u32,
    /// Pod template
    pub template: PodTemplateSpec,
}

impl Job {
    /// Creates a Job.
    pub fn new(metadata: ObjectMeta, spec: JobSpec) -> Self {
        Self {
            api_version: "batch/v1".to_string(),
            kind: "Job".to_string(),
            metadata,
            spec,
        }
    }
}

// =============================================================================
// Workload
// =============================================================================

/// The primary pod-running object of a service.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Workload {
    /// Deployment
    Deployment(Deployment),
    /// StatefulSet
    StatefulSet(StatefulSet),
    /// DaemonSet
    DaemonSet(DaemonSet),
    /// Job
    Job(Job),
}

impl Workload {
    /// Returns the pod template.
    #[must_use]
    pub const fn pod_template(&self) -> &PodTemplateSpec {
        match self {
            Self::Deployment(d) => &d.spec.template,
            Self::StatefulSet(s) => &s.spec.template,
            Self::DaemonSet(d) => &d.spec.template,
            Self::Job(j) => &j.spec.template,
        }
    }

    /// Returns the pod template for patching.
    pub fn pod_template_mut(&mut self) -> &mut PodTemplateSpec {
        match self {
            Self::Deployment(d) => &mut d.spec.template,
            Self::StatefulSet(s) => &mut s.spec.template,
            Self::DaemonSet(d) => &mut d.spec.template,
            Self::Job(j) => &mut j.spec.template,
        }
    }

    /// Returns the object metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Deployment(d) => &d.metadata,
            Self::StatefulSet(s) => &s.metadata,
            Self::DaemonSet(d) => &d.metadata,
            Self::Job(j) => &j.metadata,
        }
    }

    /// Returns the kind name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Deployment(_) => "Deployment",
            Self::StatefulSet(_) => "StatefulSet",
            Self::DaemonSet(_) => "DaemonSet",
            Self::Job(_) => "Job",
        }
    }

    /// Returns the API version.
    #[must_use]
    pub const fn api_version(&self) -> &'static str {
        match self {
            Self::Job(_) => "batch/v1",
            Self::Deployment(_) | Self::StatefulSet(_) | Self::DaemonSet(_) => "apps/v1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::pod::{Container, PodSpec};

    fn template() -> PodTemplateSpec {
        PodTemplateSpec {
            spec: PodSpec {
                containers: vec![Container {
                    name: String::from("web"),
                    image: String::from("nginx"),
                    ..Container::default()
                }],
                ..PodSpec::default()
            },
            ..PodTemplateSpec::default()
        }
    }

    #[test]
    fn test_pod_template_mut_reaches_every_kind() {
        let meta = ObjectMeta::new("web", None);
        let mut workloads = vec![
            Workload::Deployment(Deployment::new(
                meta.clone(),
                DeploymentSpec {
                    replicas: 1,
                    selector: LabelSelector::default(),
                    template: template(),
                    strategy: None,
                },
            )),
            Workload::Job(Job::new(
                meta,
                JobSpec {
                    parallelism: 2,
                    completions: 2,
                    template: template(),
                },
            )),
        ];

        for workload in &mut workloads {
            workload
                .pod_template_mut()
                .metadata
                .annotations
                .insert(String::from("k"), String::from("v"));
        }
        for workload in &workloads {
            assert_eq!(
                workload.pod_template().metadata.annotations.get("k").map(String::as_str),
                Some("v")
            );
        }
        assert_eq!(workloads[1].api_version(), "batch/v1");
    }

    #[test]
    fn test_deployment_serializes_camel_case() {
        let deployment = Deployment::new(
            ObjectMeta::new("web", None),
            DeploymentSpec {
                replicas: 3,
                selector: LabelSelector::single("app", "web"),
                template: template(),
                strategy: Some(DeploymentStrategy {
                    type_: String::from("RollingUpdate"),
                    rolling_update: Some(RollingUpdate {
                        max_surge: Some(0),
                        max_unavailable: Some(1),
                    }),
                }),
            },
        );
        let json = serde_json::to_value(&deployment).unwrap();
        assert_eq!(json["apiVersion"], "apps/v1");
        assert_eq!(json["spec"]["selector"]["matchLabels"]["app"], "web");
        assert_eq!(json["spec"]["strategy"]["rollingUpdate"]["maxSurge"], 0);
    }
}
