//! Service, Ingress and NetworkPolicy synthesis.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::compose::{Project, Protocol};
use crate::config::{ExposureConfig, ServiceType};
use crate::diagnostics::Diagnostics;
use crate::k8s::{
    HttpIngressPath, HttpIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTls, LABEL_SERVICE, NetworkPolicy, ObjectMeta,
    Service, ServiceBackendPort, ServicePort, ServiceSpec, network_label, normalize_name,
};
use crate::project::ProjectService;

/// Port name of the placeholder port of a headless Service without ports.
pub const HEADLESS_PORT_NAME: &str = "headless";
/// Port number of the placeholder port of a headless Service without ports.
pub const HEADLESS_PORT: u16 = 55555;

/// Builds the Service of `service`, if it gets one.
///
/// A Service exists when the service has effective ports and a type other
/// than `None`, or is headless. A headless Service without ports gets a
/// placeholder port.
#[must_use]
pub fn build_service(
    service: &ProjectService<'_>,
    service_type: ServiceType,
    namespace: Option<&str>,
) -> Option<Service> {
    if service_type == ServiceType::None {
        return None;
    }

    let name = normalize_name(service.name());
    let mut ports = service_ports(service);
    if ports.is_empty() {
        if service_type != ServiceType::Headless {
            return None;
        }
        ports.push(ServicePort {
            name: HEADLESS_PORT_NAME.to_string(),
            port: HEADLESS_PORT,
            target_port: HEADLESS_PORT,
            protocol: Protocol::Tcp.as_k8s().to_string(),
            node_port: None,
        });
    }

    if service_type == ServiceType::NodePort {
        let node_port = service.config().service.node_port;
        for port in &mut ports {
            port.node_port = node_port;
        }
    }

    let (type_, cluster_ip) = match service_type {
        ServiceType::Headless => (Some("ClusterIP"), Some(String::from("None"))),
        ServiceType::NodePort => (Some("NodePort"), None),
        ServiceType::LoadBalancer => (Some("LoadBalancer"), None),
        ServiceType::ClusterIp | ServiceType::None => (Some("ClusterIP"), None),
    };

    let mut selector = BTreeMap::new();
    selector.insert(LABEL_SERVICE.to_string(), name.clone());

    debug!(service = service.name(), kind = %service_type, ports = ports.len(), "Built service");
    Some(Service::new(
        ObjectMeta::new(name.as_str(), namespace).with_label(LABEL_SERVICE, name.as_str()),
        ServiceSpec {
            type_: type_.map(str::to_string),
            cluster_ip,
            selector,
            ports,
        },
    ))
}

/// Service ports, one per distinct (published port, protocol).
fn service_ports(service: &ProjectService<'_>) -> Vec<ServicePort> {
    let mut seen = HashSet::new();
    let mut names = HashSet::new();
    let mut ports = Vec::new();

    for port in service.effective_ports() {
        let published = port.service_port();
        if !seen.insert((published, port.protocol)) {
            continue;
        }
        let mut name = published.to_string();
        if !names.insert(name.clone()) {
            name = format!("{published}-{}", port.protocol);
            names.insert(name.clone());
        }
        ports.push(ServicePort {
            name,
            port: published,
            target_port: port.target,
            protocol: port.protocol.as_k8s().to_string(),
            node_port: None,
        });
    }
    ports
}

/// Builds the Ingress routing every exposure host to the first Service port.
#[must_use]
pub fn build_ingress(
    service: &ProjectService<'_>,
    exposure: &ExposureConfig,
    backend: &Service,
    namespace: Option<&str>,
) -> Option<Ingress> {
    let port = backend.spec.ports.first()?.port;
    let name = normalize_name(service.name());

    let path = HttpIngressPath {
        path: String::from("/"),
        path_type: String::from("Prefix"),
        backend: IngressBackend {
            service: IngressServiceBackend {
                name: backend.metadata.name.clone(),
                port: ServiceBackendPort { number: port },
            },
        },
    };
    let rules = exposure
        .domains
        .iter()
        .map(|host| IngressRule {
            host: host.clone(),
            http: HttpIngressRuleValue {
                paths: vec![path.clone()],
            },
        })
        .collect();
    let tls = exposure
        .tls_secret
        .iter()
        .map(|secret| IngressTls {
            hosts: exposure.domains.clone(),
            secret_name: secret.clone(),
        })
        .collect();

    debug!(service = service.name(), hosts = exposure.domains.len(), "Built ingress");
    Some(Ingress::new(
        ObjectMeta::new(name.as_str(), namespace)
            .with_label(LABEL_SERVICE, name.as_str())
            .with_annotations(&exposure.ingress_annotations),
        IngressSpec { tls, rules },
    ))
}

/// One policy per joined network, admitting traffic from the network's pods.
///
/// External networks are not managed and get no policy.
pub fn build_network_policies(
    service: &ProjectService<'_>,
    project: &Project,
    namespace: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Vec<NetworkPolicy> {
    service
        .compose()
        .joined_networks()
        .into_iter()
        .filter(|network| {
            let external = project
                .networks
                .get(network)
                .is_some_and(|declared| declared.is_external());
            if external {
                diagnostics.warn(
                    Some(service.name()),
                    format!("network '{network}' is external; no network policy emitted"),
                );
            }
            !external
        })
        .map(|network| {
            NetworkPolicy::allow_label(
                ObjectMeta::new(normalize_name(&network), namespace),
                &network_label(&network),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ServiceConfig;
    use crate::config::{ConfigResolver, K8sOverride};

    fn service(yaml: &str) -> ServiceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn view<'a>(name: &'a str, compose: &'a ServiceConfig) -> ProjectService<'a> {
        let config =
            ConfigResolver::resolve(name, compose, compose.k8s.as_ref(), &K8sOverride::default())
                .unwrap();
        ProjectService::new(name, compose, config)
    }

    #[test]
    fn test_no_ports_no_service() {
        let compose = service("image: postgres\n");
        let view = view("db", &compose);
        assert!(build_service(&view, view.service_type().unwrap(), None).is_none());
    }

    #[test]
    fn test_node_port_service() {
        let compose = service(
            "ports: [\"8080:80\"]\nx-k8s:\n  service:\n    type: NodePort\n    nodeport: 30080\n",
        );
        let view = view("web", &compose);
        let svc = build_service(&view, view.service_type().unwrap(), None).unwrap();
        assert_eq!(svc.spec.type_.as_deref(), Some("NodePort"));
        assert_eq!(svc.spec.ports.len(), 1);
        assert_eq!(svc.spec.ports[0].port, 8080);
        assert_eq!(svc.spec.ports[0].target_port, 80);
        assert_eq!(svc.spec.ports[0].node_port, Some(30080));
    }

    #[test]
    fn test_port_names_on_collision() {
        let compose = service("ports: [\"53:53/udp\", \"53:53\", \"8080:80\"]\nexpose: [\"53\"]\n");
        let view = view("dns", &compose);
        let svc = build_service(&view, ServiceType::ClusterIp, None).unwrap();
        let names: Vec<&str> = svc.spec.ports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["53", "53-tcp", "8080"]);
    }

    #[test]
    fn test_headless_placeholder() {
        let compose = service("deploy:\n  endpoint_mode: dnsrr\n");
        let view = view("peer", &compose);
        let svc = build_service(&view, view.service_type().unwrap(), None).unwrap();
        assert_eq!(svc.spec.cluster_ip.as_deref(), Some("None"));
        assert_eq!(svc.spec.ports[0].name, HEADLESS_PORT_NAME);
        assert_eq!(svc.spec.ports[0].port, HEADLESS_PORT);
    }

    #[test]
    fn test_ingress_rules_per_domain() {
        let compose = service(
            "expose: [\"3000\"]\nx-k8s:\n  service:\n    expose:\n      domain: \"a.com,b.com\"\n      tlsSecret: api-tls\n      ingressAnnotations:\n        kubernetes.io/ingress.class: nginx\n",
        );
        let view = view("api", &compose);
        let svc = build_service(&view, view.service_type().unwrap(), None).unwrap();
        let exposure = view.config().service.expose.clone().unwrap();
        let ingress = build_ingress(&view, &exposure, &svc, None).unwrap();

        let hosts: Vec<&str> = ingress.spec.rules.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["a.com", "b.com"]);
        for rule in &ingress.spec.rules {
            assert_eq!(rule.http.paths[0].backend.service.port.number, 3000);
            assert_eq!(rule.http.paths[0].backend.service.name, "api");
        }
        assert_eq!(ingress.spec.tls[0].secret_name, "api-tls");
        assert_eq!(
            ingress.metadata.annotations.get("kubernetes.io/ingress.class").map(String::as_str),
            Some("nginx")
        );
    }

    #[test]
    fn test_network_policies_skip_external() {
        let project: Project = serde_yaml::from_str(
            "services:\n  web:\n    networks: [front, shared]\nnetworks:\n  front: {}\n  shared:\n    external: true\n",
        )
        .unwrap();
        let compose = project.service("web").unwrap();
        let view = view("web", compose);
        let mut diagnostics = Diagnostics::new();
        let policies = build_network_policies(&view, &project, None, &mut diagnostics);
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].metadata.name, "front");
        assert_eq!(diagnostics.warnings().count(), 1);
    }
}
