//! Validation of merged override documents.
//!
//! The validator is the last stage of resolution: it checks a merged,
//! default-filled [`K8sOverride`] and converts it into the canonical
//! [`ResolvedServiceConfig`]. Field paths in errors use the document's
//! camelCase keys.

use tracing::debug;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::ConfigError;
use crate::units::{parse_cpu_millis, parse_duration_secs, parse_memory_bytes};

use super::resolved::{
    AutoscaleConfig, ExposureConfig, ImagePullPolicy, PodSecurityConfig, ProbeAction,
    ProbeConfig, ResolvedService, ResolvedServiceConfig, ResolvedWorkload, ResourceConfig,
    RestartPolicy, RollingUpdateConfig, ServiceType, WorkloadKind,
};
use super::spec::{
    ExposeOverride, K8sOverride, ProbeOverride, ResourcesOverride, ServiceOverride,
    WorkloadOverride,
};

/// Service account used when none is configured.
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";
/// Autoscaling utilization target used when none is configured.
pub const DEFAULT_THRESHOLD: u32 = 70;

/// Validator converting merged documents into resolved configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a merged document for one service.
    ///
    /// # Errors
    ///
    /// Returns the first failing field, or an ambiguity error when settings
    /// contradict each other.
    pub fn validate(service: &str, doc: &K8sOverride) -> Result<ResolvedServiceConfig, ConfigError> {
        if let Err(errors) = doc.validate() {
            let (field, message) = first_error(&errors);
            return Err(ConfigError::validation(service, field, message));
        }

        let empty_workload = WorkloadOverride::default();
        let empty_service = ServiceOverride::default();
        let workload = doc.workload.as_ref().unwrap_or(&empty_workload);
        let networking = doc.service.as_ref().unwrap_or(&empty_service);

        let resolved = ResolvedServiceConfig {
            disabled: doc.disabled.unwrap_or(false),
            workload: validate_workload(service, workload)?,
            service: validate_service(service, networking)?,
        };

        debug!(service, "Override validation passed");
        Ok(resolved)
    }
}

fn validate_workload(service: &str, w: &WorkloadOverride) -> Result<ResolvedWorkload, ConfigError> {
    let kind = parse_enum(service, "workload.type", w.kind.as_deref(), WorkloadKind::parse)?
        .unwrap_or_default();
    let restart_policy = parse_enum(
        service,
        "workload.restartPolicy",
        w.restart_policy.as_deref(),
        RestartPolicy::parse,
    )?
    .unwrap_or_default();

    let service_account_name = w
        .service_account_name
        .clone()
        .unwrap_or_else(|| String::from(DEFAULT_SERVICE_ACCOUNT));
    if !is_dns_subdomain(&service_account_name) {
        return Err(ConfigError::validation(
            service,
            "workload.serviceAccountName",
            format!("'{service_account_name}' is not a valid DNS subdomain"),
        ));
    }

    let image_pull = w.image_pull.clone().unwrap_or_default();
    let image_pull_policy = parse_enum(
        service,
        "workload.imagePull.policy",
        image_pull.policy.as_deref(),
        ImagePullPolicy::parse,
    )?
    .unwrap_or_default();

    let pod_security = w
        .pod_security
        .as_ref()
        .map(|s| PodSecurityConfig {
            run_as_user: s.run_as_user,
            run_as_group: s.run_as_group,
            fs_group: s.fs_group,
        })
        .unwrap_or_default();

    let rolling_update = w.rolling_update.as_ref().map(|r| RollingUpdateConfig {
        max_surge: r.max_surge,
        max_unavailable: r.max_unavailable,
    });

    let autoscale = w.autoscale.clone().unwrap_or_default();

    Ok(ResolvedWorkload {
        kind,
        replicas: w.replicas.unwrap_or(1),
        restart_policy,
        service_account_name,
        image_pull_policy,
        image_pull_secret: image_pull.secret.filter(|s| !s.is_empty()),
        command: w.command.clone(),
        command_args: w.command_args.clone(),
        annotations: w.annotations.clone().unwrap_or_default(),
        pod_security,
        rolling_update,
        liveness_probe: validate_probe(service, "workload.livenessProbe", w.liveness_probe.as_ref())?,
        readiness_probe: validate_probe(
            service,
            "workload.readinessProbe",
            w.readiness_probe.as_ref(),
        )?,
        resources: validate_resources(service, w.resources.as_ref())?,
        autoscale: AutoscaleConfig {
            max_replicas: autoscale.max_replicas.unwrap_or(0),
            cpu_threshold: autoscale.cpu_threshold.unwrap_or(DEFAULT_THRESHOLD),
            mem_threshold: autoscale.mem_threshold.unwrap_or(DEFAULT_THRESHOLD),
        },
    })
}

fn validate_probe(
    service: &str,
    path: &str,
    probe: Option<&ProbeOverride>,
) -> Result<Option<ProbeConfig>, ConfigError> {
    let Some(probe) = probe else {
        return Ok(None);
    };

    // Without an explicit type the configured action decides.
    let kind = match probe.kind.as_deref() {
        Some(kind) => kind.to_ascii_lowercase(),
        None if probe.exec.is_some() => String::from("exec"),
        None if probe.http.is_some() => String::from("http"),
        None if probe.tcp.is_some() => String::from("tcp"),
        None => String::from("none"),
    };

    let action = match kind.as_str() {
        "none" => return Ok(None),
        "exec" => {
            let command = probe
                .exec
                .as_ref()
                .and_then(|e| e.command.clone())
                .unwrap_or_default();
            if command.is_empty() {
                return Err(ConfigError::validation(
                    service,
                    format!("{path}.exec.command"),
                    "exec probe requires a non-empty command",
                ));
            }
            ProbeAction::Exec { command }
        }
        "http" => {
            let http = probe.http.as_ref();
            let path_value = http.and_then(|h| h.path.clone()).ok_or_else(|| {
                ConfigError::validation(service, format!("{path}.http.path"), "http probe requires a path")
            })?;
            let port = http.and_then(|h| h.port).ok_or_else(|| {
                ConfigError::validation(service, format!("{path}.http.port"), "http probe requires a port")
            })?;
            ProbeAction::Http {
                path: path_value,
                port,
            }
        }
        "tcp" => {
            let port = probe.tcp.as_ref().and_then(|t| t.port).ok_or_else(|| {
                ConfigError::validation(service, format!("{path}.tcp.port"), "tcp probe requires a port")
            })?;
            ProbeAction::Tcp { port }
        }
        other => {
            return Err(ConfigError::validation(
                service,
                format!("{path}.type"),
                format!("unknown probe type '{other}' (expected exec, http, tcp or none)"),
            ));
        }
    };

    let duration = |field: &str, value: Option<&String>| -> Result<Option<u64>, ConfigError> {
        value
            .map(|v| {
                parse_duration_secs(v)
                    .map_err(|e| ConfigError::validation(service, format!("{path}.{field}"), e))
            })
            .transpose()
    };

    Ok(Some(ProbeConfig {
        action,
        initial_delay_secs: duration("initialDelay", probe.initial_delay.as_ref())?,
        period_secs: duration("period", probe.period.as_ref())?,
        timeout_secs: duration("timeout", probe.timeout.as_ref())?,
        failure_threshold: probe.failure_threshold,
        success_threshold: probe.success_threshold,
    }))
}

fn validate_resources(
    service: &str,
    resources: Option<&ResourcesOverride>,
) -> Result<ResourceConfig, ConfigError> {
    let Some(r) = resources else {
        return Ok(ResourceConfig::default());
    };

    let quantity = |field: &str,
                    value: Option<&String>,
                    parse: fn(&str) -> Result<u64, String>|
     -> Result<Option<u64>, ConfigError> {
        value
            .map(|v| {
                parse(v).map_err(|e| {
                    ConfigError::validation(service, format!("workload.resources.{field}"), e)
                })
            })
            .transpose()
    };

    Ok(ResourceConfig {
        memory_request: quantity("memory", r.memory.as_ref(), parse_memory_bytes)?,
        memory_limit: quantity("maxMemory", r.max_memory.as_ref(), parse_memory_bytes)?,
        cpu_request: quantity("cpu", r.cpu.as_ref(), parse_cpu_millis)?,
        cpu_limit: quantity("maxCpu", r.max_cpu.as_ref(), parse_cpu_millis)?,
        storage_request: quantity("storage", r.storage.as_ref(), parse_memory_bytes)?,
        storage_limit: quantity("maxStorage", r.max_storage.as_ref(), parse_memory_bytes)?,
    })
}

fn validate_service(service: &str, s: &ServiceOverride) -> Result<ResolvedService, ConfigError> {
    let kind = parse_enum(service, "service.type", s.kind.as_deref(), ServiceType::parse)?
        .unwrap_or_default();

    Ok(ResolvedService {
        kind,
        node_port: s.node_port,
        expose: validate_expose(service, s.expose.as_ref())?,
    })
}

fn validate_expose(
    service: &str,
    expose: Option<&ExposeOverride>,
) -> Result<Option<ExposureConfig>, ConfigError> {
    let Some(expose) = expose else {
        return Ok(None);
    };

    let domains: Vec<String> = expose
        .domain
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();

    let tls_secret = expose.tls_secret.clone().filter(|s| !s.is_empty());
    if domains.is_empty() {
        if tls_secret.is_some() {
            return Err(ConfigError::ambiguous(
                service,
                "service.expose.tlsSecret is set but no exposure domain is configured",
            ));
        }
        return Ok(None);
    }

    if let Some(bad) = domains.iter().find(|d| !is_dns_subdomain(d)) {
        return Err(ConfigError::validation(
            service,
            "service.expose.domain",
            format!("'{bad}' is not a valid host name"),
        ));
    }

    Ok(Some(ExposureConfig {
        domains,
        tls_secret,
        ingress_annotations: expose.ingress_annotations.clone().unwrap_or_default(),
    }))
}

fn parse_enum<T>(
    service: &str,
    field: &str,
    value: Option<&str>,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            parse(v).ok_or_else(|| {
                ConfigError::validation(service, field, format!("unsupported value '{v}'"))
            })
        })
        .transpose()
}

/// Returns the first validation failure as `(field path, message)`.
///
/// Paths are sorted so the reported error does not depend on hash order.
fn first_error(errors: &ValidationErrors) -> (String, String) {
    let mut flat = Vec::new();
    flatten_errors(errors, "", &mut flat);
    flat.sort();
    flat.into_iter()
        .next()
        .unwrap_or_else(|| (String::new(), String::from("validation failed")))
}

fn flatten_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<(String, String)>) {
    for (name, kind) in errors.errors() {
        let key = camel_case(&name.to_string());
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match kind {
            ValidationErrorsKind::Struct(nested) => flatten_errors(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten_errors(nested, &format!("{path}[{index}]"), out);
                }
            }
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.push((path.clone(), describe(error)));
                }
            }
        }
    }
}

fn describe(error: &validator::ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let bound = |key: &str| error.params.get(key).map(ToString::to_string);
    match (error.code.as_ref(), bound("min"), bound("max")) {
        ("range", Some(min), Some(max)) => format!("must be between {min} and {max}"),
        ("range", Some(min), None) => format!("must be at least {min}"),
        ("range", None, Some(max)) => format!("must be at most {max}"),
        (code, _, _) => format!("failed check '{code}'"),
    }
}

/// Converts a Rust field name to the document's camelCase spelling.
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    match out.as_str() {
        "kind" => String::from("type"),
        "nodePort" => String::from("nodeport"),
        _ => out,
    }
}

/// Returns true if `name` is a valid DNS-1123 label.
///
/// Labels are at most 63 characters of lowercase alphanumerics and hyphens,
/// starting and ending with an alphanumeric character.
#[must_use]
pub fn is_dns_label(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }
    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    alnum(bytes[0])
        && alnum(bytes[bytes.len() - 1])
        && bytes.iter().all(|b| alnum(*b) || *b == b'-')
}

/// Returns true if `name` is a valid DNS-1123 subdomain.
#[must_use]
pub fn is_dns_subdomain(name: &str) -> bool {
    !name.is_empty() && name.len() <= 253 && name.split('.').all(is_dns_label)
}
