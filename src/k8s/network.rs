//! Service, Ingress and NetworkPolicy types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::meta::{LabelSelector, ObjectMeta};

// =============================================================================
// Service
// =============================================================================

/// Kubernetes Service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: ServiceSpec,
}

/// Service spec.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Service type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// `None` for headless services
    #[serde(rename = "clusterIP", default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
    /// Pod selector
    pub selector: BTreeMap<String, String>,
    /// Ports
    pub ports: Vec<ServicePort>,
}

/// Service port.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    /// Port name
    pub name: String,
    /// Service port
    pub port: u16,
    /// Container port
    pub target_port: u16,
    /// Protocol
    pub protocol: String,
    /// Fixed node port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_port: Option<u16>,
}

impl Service {
    /// Creates a Service.
    pub fn new(metadata: ObjectMeta, spec: ServiceSpec) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata,
            spec,
        }
    }
}

// =============================================================================
// Ingress
// =============================================================================

/// Kubernetes Ingress.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: IngressSpec,
}

/// Ingress spec.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    /// TLS termination
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls: Vec<IngressTls>,
    /// Host rules
    pub rules: Vec<IngressRule>,
}

/// TLS block.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngressTls {
    /// Hosts covered by the certificate
    pub hosts: Vec<String>,
    /// Secret holding the certificate
    pub secret_name: String,
}

/// Host rule.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressRule {
    /// Host name
    pub host: String,
    /// HTTP routing
    pub http: HttpIngressRuleValue,
}

/// HTTP routing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpIngressRuleValue {
    /// Paths
    pub paths: Vec<HttpIngressPath>,
}

/// One routed path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpIngressPath {
    /// Path
    pub path: String,
    /// `Prefix`, `Exact` or `ImplementationSpecific`
    pub path_type: String,
    /// Backend
    pub backend: IngressBackend,
}

/// Ingress backend.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressBackend {
    /// Target Service
    pub service: IngressServiceBackend,
}

/// Backend Service and port.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressServiceBackend {
    /// Service name
    pub name: String,
    /// Service port
    pub port: ServiceBackendPort,
}

/// Backend port by number.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceBackendPort {
    /// Port number
    pub number: u16,
}

impl Ingress {
    /// Creates an Ingress.
    pub fn new(metadata: ObjectMeta, spec: IngressSpec) -> Self {
        Self {
            api_version: "networking.k8s.io/v1".to_string(),
            kind: "Ingress".to_string(),
            metadata,
            spec,
        }
    }
}

// =============================================================================
// NetworkPolicy
// =============================================================================

/// Kubernetes NetworkPolicy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: NetworkPolicySpec,
}

/// NetworkPolicy spec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicySpec {
    /// Pods the policy applies to
    pub pod_selector: LabelSelector,
    /// Allowed ingress
    pub ingress: Vec<NetworkPolicyIngressRule>,
}

/// Ingress rule.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkPolicyIngressRule {
    /// Allowed peers
    pub from: Vec<NetworkPolicyPeer>,
}

/// Allowed peer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyPeer {
    /// Peer pods
    pub pod_selector: LabelSelector,
}

impl NetworkPolicy {
    /// Creates a policy admitting traffic only from pods carrying `label`.
    pub fn allow_label(metadata: ObjectMeta, label: &str) -> Self {
        let selector = LabelSelector::single(label, "true");
        Self {
            api_version: "networking.k8s.io/v1".to_string(),
            kind: "NetworkPolicy".to_string(),
            metadata,
            spec: NetworkPolicySpec {
                pod_selector: selector.clone(),
                ingress: vec![NetworkPolicyIngressRule {
                    from: vec![NetworkPolicyPeer {
                        pod_selector: selector,
                    }],
                }],
            },
        }
    }
}
