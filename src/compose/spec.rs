//! Compose project model consumed by the engine.
//!
//! These types mirror the normalized output of a Compose loader. They are
//! treated as read-only input: nothing in the engine mutates a `Project`
//! after it has been loaded.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use serde_yaml::Value;

use super::de::{self, StringOrList};

/// The root of a Compose project.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Project {
    /// Project name.
    #[serde(default)]
    pub name: Option<String>,
    /// Services keyed by name.
    #[serde(default, deserialize_with = "de::map_with_null_values")]
    pub services: BTreeMap<String, ServiceConfig>,
    /// Top-level named volumes.
    #[serde(default, deserialize_with = "de::map_with_null_values")]
    pub volumes: BTreeMap<String, VolumeConfig>,
    /// Top-level secrets.
    #[serde(default, deserialize_with = "de::map_with_null_values")]
    pub secrets: BTreeMap<String, FileObjectConfig>,
    /// Top-level configs.
    #[serde(default, deserialize_with = "de::map_with_null_values")]
    pub configs: BTreeMap<String, FileObjectConfig>,
    /// Top-level networks.
    #[serde(default, deserialize_with = "de::map_with_null_values")]
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Project-wide Kubernetes override document.
    #[serde(default, rename = "x-k8s")]
    pub k8s: Option<Value>,
    /// Directory relative file references are resolved against.
    #[serde(skip)]
    pub working_dir: PathBuf,
}

/// A single Compose service.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Container image.
    #[serde(default)]
    pub image: Option<String>,
    /// Command override.
    #[serde(default)]
    pub command: Option<StringOrList>,
    /// Entrypoint override.
    #[serde(default)]
    pub entrypoint: Option<StringOrList>,
    /// Working directory inside the container.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Container hostname.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Container domain name.
    #[serde(default)]
    pub domainname: Option<String>,
    /// User (`uid[:gid]`).
    #[serde(default, deserialize_with = "de::optional_scalar")]
    pub user: Option<String>,
    /// Environment variables in declaration order.
    #[serde(default)]
    pub environment: Environment,
    /// Published ports.
    #[serde(default)]
    pub ports: Vec<PortConfig>,
    /// Ports exposed to linked services only.
    #[serde(default)]
    pub expose: Vec<ExposeConfig>,
    /// Volume mounts, still in their written form.
    #[serde(default)]
    pub volumes: Vec<VolumeMountEntry>,
    /// Services whose volumes are inherited (`service[:ro|:rw]`).
    #[serde(default)]
    pub volumes_from: Vec<String>,
    /// Swarm deploy block.
    #[serde(default)]
    pub deploy: Option<DeployConfig>,
    /// Restart policy (`no`, `always`, `on-failure`, `unless-stopped`).
    #[serde(default)]
    pub restart: Option<String>,
    /// Service labels.
    #[serde(default)]
    pub labels: Labels,
    /// Health check.
    #[serde(default)]
    pub healthcheck: Option<HealthCheckConfig>,
    /// Secrets granted to the service.
    #[serde(default)]
    pub secrets: Vec<FileReference>,
    /// Configs granted to the service.
    #[serde(default)]
    pub configs: Vec<FileReference>,
    /// Networks the service joins.
    #[serde(default)]
    pub networks: Networks,
    /// Capabilities to add.
    #[serde(default)]
    pub cap_add: Vec<String>,
    /// Capabilities to drop.
    #[serde(default)]
    pub cap_drop: Vec<String>,
    /// Privileged mode.
    #[serde(default)]
    pub privileged: bool,
    /// Read-only root filesystem.
    #[serde(default)]
    pub read_only: bool,
    /// Grace period before the container is killed.
    #[serde(default)]
    pub stop_grace_period: Option<String>,
    /// Image pull policy (`always`, `never`, `missing`, `build`).
    #[serde(default)]
    pub pull_policy: Option<String>,
    /// Service-level Kubernetes override document.
    #[serde(default, rename = "x-k8s")]
    pub k8s: Option<Value>,
}

/// Environment variables, preserving declaration order.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Value")]
pub struct Environment(pub Vec<(String, Option<String>)>);

impl TryFrom<Value> for Environment {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        de::ordered_pairs(&value)
            .map(Self)
            .map_err(|entry| format!("invalid environment entry: {entry}"))
    }
}

impl Environment {
    /// Returns the value declared for a variable, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Iterates over the declared variables.
    pub fn iter(&self) -> impl Iterator<Item = &(String, Option<String>)> {
        self.0.iter()
    }

    /// Returns true if no variables are declared.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Labels written as a map or as a `key=value` list.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Value")]
pub struct Labels(pub BTreeMap<String, String>);

impl TryFrom<Value> for Labels {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let pairs = de::ordered_pairs(&value).map_err(|entry| format!("invalid label: {entry}"))?;
        Ok(Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or_default()))
                .collect(),
        ))
    }
}

impl Labels {
    /// Returns a label value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Networks written as a list of names or a map of attachments.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Value")]
pub struct Networks(pub Vec<String>);

impl TryFrom<Value> for Networks {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Sequence(items) => items
                .iter()
                .map(|item| de::scalar_to_string(item).ok_or_else(|| format!("invalid network: {item:?}")))
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            Value::Mapping(mapping) => mapping
                .keys()
                .map(|key| de::scalar_to_string(key).ok_or_else(|| format!("invalid network: {key:?}")))
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(format!("invalid networks block: {other:?}")),
        }
    }
}

/// Transport protocol of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Protocol {
    /// TCP.
    #[default]
    Tcp,
    /// UDP.
    Udp,
    /// SCTP.
    Sctp,
}

impl Protocol {
    /// Parses a Compose protocol name.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown protocols.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "sctp" => Ok(Self::Sctp),
            other => Err(format!("Invalid protocol: {other}. Expected: tcp, udp or sctp")),
        }
    }

    /// Kubernetes spelling of the protocol.
    #[must_use]
    pub const fn as_k8s(self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Sctp => "SCTP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        };
        write!(f, "{s}")
    }
}

/// A published port.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct PortConfig {
    /// Container port.
    pub target: u16,
    /// Host / service port, when published.
    pub published: Option<u16>,
    /// Protocol.
    pub protocol: Protocol,
    /// Host IP binding.
    pub host_ip: Option<String>,
}

impl TryFrom<Value> for PortConfig {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Mapping(ref mapping) => {
                let field = |name: &str| mapping.get(name).and_then(de::scalar_to_string);
                let target = field("target")
                    .ok_or_else(|| String::from("long port syntax requires 'target'"))?;
                let target = parse_port_number(&target)?;
                let published = field("published")
                    .filter(|p| !p.is_empty())
                    .map(|p| parse_port_number(&p))
                    .transpose()?;
                let protocol = field("protocol")
                    .map_or(Ok(Protocol::Tcp), |p| Protocol::parse(&p))?;
                Ok(Self {
                    target,
                    published,
                    protocol,
                    host_ip: field("host_ip"),
                })
            }
            other => {
                let spec = de::scalar_to_string(&other)
                    .ok_or_else(|| format!("invalid port entry: {other:?}"))?;
                Self::parse(&spec)
            }
        }
    }
}

impl PortConfig {
    /// Parses the short port syntax: `[[host_ip:]published:]target[/protocol]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port format is invalid.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (ports, protocol) = match s.split_once('/') {
            Some((ports, proto)) => (ports, Protocol::parse(proto)?),
            None => (s, Protocol::Tcp),
        };

        let parts: Vec<&str> = ports.split(':').collect();
        let (host_ip, published, target) = match parts.as_slice() {
            [target] => (None, None, *target),
            [published, target] => (None, Some(*published), *target),
            [host_ip, published, target] => (Some(*host_ip), Some(*published), *target),
            _ => return Err(format!("Invalid port format: {s}")),
        };

        Ok(Self {
            target: parse_port_number(target)?,
            published: published
                .filter(|p| !p.is_empty())
                .map(parse_port_number)
                .transpose()?,
            protocol,
            host_ip: host_ip.map(str::to_string),
        })
    }

    /// Creates a port with the given target and protocol.
    #[must_use]
    pub const fn new(target: u16, protocol: Protocol) -> Self {
        Self {
            target,
            published: None,
            protocol,
            host_ip: None,
        }
    }

    /// Port the Kubernetes Service listens on.
    #[must_use]
    pub fn service_port(&self) -> u16 {
        self.published.unwrap_or(self.target)
    }
}

/// An `expose` entry (`"80"` or `"80/udp"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct ExposeConfig {
    /// Container port.
    pub port: u16,
    /// Protocol, TCP unless given.
    pub protocol: Protocol,
}

impl TryFrom<Value> for ExposeConfig {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let spec = de::scalar_to_string(&value)
            .ok_or_else(|| format!("invalid expose entry: {value:?}"))?;
        let (port, protocol) = match spec.split_once('/') {
            Some((port, proto)) => (port, Protocol::parse(proto)?),
            None => (spec.as_str(), Protocol::Tcp),
        };
        Ok(Self {
            port: parse_port_number(port)?,
            protocol,
        })
    }
}

fn parse_port_number(s: &str) -> Result<u16, String> {
    s.trim()
        .parse::<u16>()
        .map_err(|_| format!("Invalid port number: {s}"))
}

/// A volume mount as written: short string or long mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VolumeMountEntry {
    /// `[source:]target[:mode]`.
    Short(String),
    /// Long syntax.
    Long(LongVolumeMount),
}

/// Long volume mount syntax.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LongVolumeMount {
    /// `volume`, `bind` or `tmpfs`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Volume name or host path.
    #[serde(default)]
    pub source: Option<String>,
    /// Mount path in the container.
    #[serde(default)]
    pub target: Option<String>,
    /// Mount read-only.
    #[serde(default)]
    pub read_only: bool,
}

impl fmt::Display for VolumeMountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short(s) => write!(f, "{s}"),
            Self::Long(long) => write!(
                f,
                "{}:{}",
                long.source.as_deref().unwrap_or(""),
                long.target.as_deref().unwrap_or("")
            ),
        }
    }
}

/// Swarm `deploy` block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DeployConfig {
    /// `replicated` or `global`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Desired replica count.
    #[serde(default)]
    pub replicas: Option<u32>,
    /// Resource reservations and limits.
    #[serde(default)]
    pub resources: Option<ResourcesConfig>,
    /// Restart policy.
    #[serde(default)]
    pub restart_policy: Option<RestartPolicyConfig>,
    /// Rolling update settings.
    #[serde(default)]
    pub update_config: Option<UpdateConfig>,
    /// Placement constraints.
    #[serde(default)]
    pub placement: Option<PlacementConfig>,
    /// `vip` or `dnsrr`.
    #[serde(default)]
    pub endpoint_mode: Option<String>,
    /// Labels on the service rather than its containers.
    #[serde(default)]
    pub labels: Labels,
}

impl DeployConfig {
    /// Returns true if the service runs one task per node.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("global"))
    }
}

/// Resource reservations and limits.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ResourcesConfig {
    /// Hard limits.
    #[serde(default)]
    pub limits: Option<ResourceSpec>,
    /// Guaranteed reservations.
    #[serde(default)]
    pub reservations: Option<ResourceSpec>,
}

/// CPU and memory amounts.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ResourceSpec {
    /// CPUs, e.g. `0.5`.
    #[serde(default, deserialize_with = "de::optional_scalar")]
    pub cpus: Option<String>,
    /// Memory, e.g. `512M`.
    #[serde(default, deserialize_with = "de::optional_scalar")]
    pub memory: Option<String>,
}

/// Swarm restart policy.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RestartPolicyConfig {
    /// `none`, `on-failure` or `any`.
    #[serde(default)]
    pub condition: Option<String>,
    /// Maximum restart attempts.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Swarm rolling update settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Containers updated at a time.
    #[serde(default)]
    pub parallelism: Option<u32>,
    /// `stop-first` or `start-first`.
    #[serde(default)]
    pub order: Option<String>,
}

/// Placement constraints.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PlacementConfig {
    /// Constraint expressions such as `node.role==worker`.
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// Compose health check.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HealthCheckConfig {
    /// Test command (`["CMD", ...]`, `["CMD-SHELL", "..."]`, `["NONE"]`).
    #[serde(default)]
    pub test: Option<StringOrList>,
    /// Interval between checks.
    #[serde(default)]
    pub interval: Option<String>,
    /// Timeout per check.
    #[serde(default)]
    pub timeout: Option<String>,
    /// Grace period before failures count.
    #[serde(default)]
    pub start_period: Option<String>,
    /// Failures before unhealthy.
    #[serde(default)]
    pub retries: Option<u32>,
    /// Disable the image's health check.
    #[serde(default)]
    pub disable: bool,
}

/// A service's reference to a top-level secret or config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileReference {
    /// Just the name.
    Short(String),
    /// Name plus mount target.
    Long {
        /// Top-level object name.
        source: String,
        /// Mount target.
        #[serde(default)]
        target: Option<String>,
    },
}

impl FileReference {
    /// Top-level object name.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Short(source) | Self::Long { source, .. } => source.as_str(),
        }
    }

    /// Explicit mount target, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Short(_) => None,
            Self::Long { target, .. } => target.as_deref(),
        }
    }
}

/// Top-level named volume.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VolumeConfig {
    /// Volume driver.
    #[serde(default)]
    pub driver: Option<String>,
    /// Whether the volume is managed outside the project.
    #[serde(default)]
    pub external: Option<Value>,
    /// Volume labels.
    #[serde(default)]
    pub labels: Labels,
    /// Kubernetes storage override.
    #[serde(default, rename = "x-k8s")]
    pub k8s: Option<Value>,
}

/// Top-level secret or config.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileObjectConfig {
    /// Local file backing the object.
    #[serde(default)]
    pub file: Option<String>,
    /// Inline content (configs only).
    #[serde(default)]
    pub content: Option<String>,
    /// Whether the object is managed outside the project.
    #[serde(default)]
    pub external: Option<Value>,
    /// Name of the object in the platform.
    #[serde(default)]
    pub name: Option<String>,
}

impl FileObjectConfig {
    /// Returns true if the object is declared external.
    #[must_use]
    pub fn is_external(&self) -> bool {
        is_external(self.external.as_ref())
    }
}

/// Top-level network.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Network driver.
    #[serde(default)]
    pub driver: Option<String>,
    /// Whether the network is managed outside the project.
    #[serde(default)]
    pub external: Option<Value>,
    /// Platform name of the network.
    #[serde(default)]
    pub name: Option<String>,
}

impl NetworkConfig {
    /// Returns true if the network is declared external.
    #[must_use]
    pub fn is_external(&self) -> bool {
        is_external(self.external.as_ref())
    }
}

/// `external: true` and `external: { name: x }` both mark external objects.
fn is_external(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Mapping(_)) => true,
        _ => false,
    }
}

/// Name of the network services join when they declare none.
pub const DEFAULT_NETWORK: &str = "default";

impl Project {
    /// Returns the service with the given name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }

    /// Returns service names in lexicographic order.
    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }
}

impl ServiceConfig {
    /// Networks joined by the service, falling back to the default network.
    #[must_use]
    pub fn joined_networks(&self) -> Vec<String> {
        if self.networks.0.is_empty() {
            vec![String::from(DEFAULT_NETWORK)]
        } else {
            self.networks.0.clone()
        }
    }

    /// Returns true if the service runs in global mode.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.deploy.as_ref().is_some_and(DeployConfig::is_global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_config_parse() {
        let port = PortConfig::parse("8080:80");
        assert!(port.is_ok());
        let port = port.unwrap();
        assert_eq!(port.target, 80);
        assert_eq!(port.published, Some(8080));
        assert_eq!(port.protocol, Protocol::Tcp);
    }

    #[test]
    fn test_port_config_parse_udp_with_host_ip() {
        let port = PortConfig::parse("127.0.0.1:53:53/udp").unwrap();
        assert_eq!(port.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(port.protocol, Protocol::Udp);
        assert_eq!(port.service_port(), 53);
    }

    #[test]
    fn test_port_config_invalid() {
        assert!(PortConfig::parse("invalid").is_err());
        assert!(PortConfig::parse("80/quic").is_err());
    }

    #[test]
    fn test_long_port_syntax() {
        let port: PortConfig =
            serde_yaml::from_str("target: 80\npublished: \"8080\"\nprotocol: udp\n").unwrap();
        assert_eq!(port.target, 80);
        assert_eq!(port.published, Some(8080));
        assert_eq!(port.protocol, Protocol::Udp);
    }

    #[test]
    fn test_numeric_port_and_expose() {
        let port: PortConfig = serde_yaml::from_str("3000").unwrap();
        assert_eq!(port.target, 3000);
        assert_eq!(port.published, None);

        let expose: ExposeConfig = serde_yaml::from_str("\"9000/udp\"").unwrap();
        assert_eq!(expose.port, 9000);
        assert_eq!(expose.protocol, Protocol::Udp);
    }

    #[test]
    fn test_networks_from_map() {
        let networks: Networks = serde_yaml::from_str("front:\n  aliases: [web]\nback:\n").unwrap();
        assert_eq!(networks.0, vec!["front", "back"]);
    }

    #[test]
    fn test_default_network() {
        let service = ServiceConfig::default();
        assert_eq!(service.joined_networks(), vec![DEFAULT_NETWORK]);
    }
}
