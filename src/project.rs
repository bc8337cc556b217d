//! Read-only pairing of a Compose service with its resolved configuration.
//!
//! [`ProjectService`] is built once per run and answers the derived
//! questions the synthesizer asks: which ports are effective, which
//! Service type applies, which probes and resources the container gets.

use std::collections::HashSet;

use tracing::debug;

use crate::compose::{PortConfig, Protocol, ServiceConfig};
use crate::config::{ProbeAction, ProbeConfig, ResolvedServiceConfig, ServiceType, WorkloadKind};
use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::k8s::{ExecAction, HttpGetAction, Probe, TcpSocketAction};

/// A Compose service paired with its resolved configuration.
#[derive(Debug, Clone)]
pub struct ProjectService<'a> {
    name: &'a str,
    compose: &'a ServiceConfig,
    config: ResolvedServiceConfig,
}

impl<'a> ProjectService<'a> {
    /// Creates the view.
    #[must_use]
    pub const fn new(
        name: &'a str,
        compose: &'a ServiceConfig,
        config: ResolvedServiceConfig,
    ) -> Self {
        Self {
            name,
            compose,
            config,
        }
    }

    /// Service name as declared in the project.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// The Compose definition.
    #[must_use]
    pub const fn compose(&self) -> &'a ServiceConfig {
        self.compose
    }

    /// The resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolvedServiceConfig {
        &self.config
    }

    /// Declared ports followed by `expose` entries.
    ///
    /// No two entries share a (target, protocol) pair; the first occurrence
    /// wins.
    #[must_use]
    pub fn effective_ports(&self) -> Vec<PortConfig> {
        let mut seen: HashSet<(u16, Protocol)> = HashSet::new();
        let mut ports = Vec::new();

        for port in &self.compose.ports {
            if seen.insert((port.target, port.protocol)) {
                ports.push(port.clone());
            }
        }
        for expose in &self.compose.expose {
            if seen.insert((expose.port, expose.protocol)) {
                ports.push(PortConfig::new(expose.port, expose.protocol));
            }
        }
        ports
    }

    /// Resolved Service type, checked against the node port setting.
    ///
    /// # Errors
    ///
    /// Returns an ambiguity error if a node port is set while the type is
    /// not `NodePort`, or while more than one port is effective.
    pub fn service_type(&self) -> Result<ServiceType, ConfigError> {
        let service = &self.config.service;
        if let Some(node_port) = service.node_port {
            if service.kind != ServiceType::NodePort {
                return Err(ConfigError::ambiguous(
                    self.name,
                    format!(
                        "node port {node_port} is set but the service type is {}",
                        service.kind
                    ),
                ));
            }
            let count = self.effective_ports().len();
            if count > 1 {
                return Err(ConfigError::ambiguous(
                    self.name,
                    format!("node port {node_port} cannot be applied to {count} ports"),
                ));
            }
        }
        Ok(service.kind)
    }

    /// Resolved workload kind.
    ///
    /// Explicit configuration wins over Compose global mode; the conflict is
    /// reported as a warning.
    pub fn workload_type(&self, diagnostics: &mut Diagnostics) -> WorkloadKind {
        let kind = self.config.workload.kind;
        if self.compose.is_global() && kind != WorkloadKind::DaemonSet {
            diagnostics.warn(
                Some(self.name),
                format!("Compose global mode ignored: workload type is explicitly {kind}"),
            );
        }
        kind
    }

    /// Liveness probe, if any.
    ///
    /// # Errors
    ///
    /// Returns an error for an exec probe without a command.
    pub fn liveness_probe(&self) -> Result<Option<Probe>, ConfigError> {
        self.probe("workload.livenessProbe", self.config.workload.liveness_probe.as_ref())
    }

    /// Readiness probe, if any.
    ///
    /// # Errors
    ///
    /// Returns an error for an exec probe without a command.
    pub fn readiness_probe(&self) -> Result<Option<Probe>, ConfigError> {
        self.probe("workload.readinessProbe", self.config.workload.readiness_probe.as_ref())
    }

    fn probe(&self, field: &str, probe: Option<&ProbeConfig>) -> Result<Option<Probe>, ConfigError> {
        let Some(probe) = probe else {
            return Ok(None);
        };

        let mut k8s = Probe {
            initial_delay_seconds: probe.initial_delay_secs,
            period_seconds: probe.period_secs,
            timeout_seconds: probe.timeout_secs,
            failure_threshold: probe.failure_threshold,
            success_threshold: probe.success_threshold,
            ..Probe::default()
        };
        match &probe.action {
            ProbeAction::Exec { command } => {
                if command.is_empty() {
                    return Err(ConfigError::validation(
                        self.name,
                        format!("{field}.exec.command"),
                        "exec probe requires a non-empty command",
                    ));
                }
                k8s.exec = Some(ExecAction {
                    command: command.clone(),
                });
            }
            ProbeAction::Http { path, port } => {
                k8s.http_get = Some(HttpGetAction {
                    path: path.clone(),
                    port: *port,
                });
            }
            ProbeAction::Tcp { port } => {
                k8s.tcp_socket = Some(TcpSocketAction { port: *port });
            }
        }
        debug!(service = self.name, field, "Built probe");
        Ok(Some(k8s))
    }

    /// Memory request in bytes, `0` when unset.
    #[must_use]
    pub fn memory_request(&self) -> u64 {
        self.config.workload.resources.memory_request.unwrap_or(0)
    }

    /// Memory limit in bytes, `0` when unset.
    #[must_use]
    pub fn memory_limit(&self) -> u64 {
        self.config.workload.resources.memory_limit.unwrap_or(0)
    }

    /// CPU request in millicores, `0` when unset.
    #[must_use]
    pub fn cpu_request(&self) -> u64 {
        self.config.workload.resources.cpu_request.unwrap_or(0)
    }

    /// CPU limit in millicores, `0` when unset.
    #[must_use]
    pub fn cpu_limit(&self) -> u64 {
        self.config.workload.resources.cpu_limit.unwrap_or(0)
    }

    /// Ephemeral storage request in bytes, `0` when unset.
    #[must_use]
    pub fn storage_request(&self) -> u64 {
        self.config.workload.resources.storage_request.unwrap_or(0)
    }

    /// Ephemeral storage limit in bytes, `0` when unset.
    #[must_use]
    pub fn storage_limit(&self) -> u64 {
        self.config.workload.resources.storage_limit.unwrap_or(0)
    }

    /// Desired replica count.
    #[must_use]
    pub const fn replicas(&self) -> u32 {
        self.config.workload.replicas
    }
}
