//! Override values inferred from a plain Compose service definition.
//!
//! The inferred document sits between the system defaults and the explicit
//! overrides in the precedence cascade. Unrecognized Compose values are left
//! unset so the defaults apply.

use crate::compose::{HealthCheckConfig, ServiceConfig, StringOrList};
use crate::units::parse_compose_memory_bytes;

use super::spec::{
    ExecProbeOverride, ImagePullOverride, K8sOverride, ProbeOverride, ResourcesOverride,
    RollingUpdateOverride, ServiceOverride, WorkloadOverride,
};

/// Builds the override implied by a Compose service.
#[must_use]
pub fn infer_override(service: &ServiceConfig) -> K8sOverride {
    let workload = WorkloadOverride {
        kind: infer_workload_kind(service).map(str::to_string),
        replicas: service.deploy.as_ref().and_then(|d| d.replicas),
        restart_policy: infer_restart_policy(service).map(str::to_string),
        image_pull: infer_pull_policy(service.pull_policy.as_deref()).map(|policy| {
            ImagePullOverride {
                policy: Some(policy.to_string()),
                secret: None,
            }
        }),
        rolling_update: infer_rolling_update(service),
        liveness_probe: service.healthcheck.as_ref().and_then(infer_probe),
        resources: infer_resources(service),
        ..WorkloadOverride::default()
    };

    let service_section = infer_service_type(service).map(|kind| ServiceOverride {
        kind: Some(kind.to_string()),
        ..ServiceOverride::default()
    });

    K8sOverride {
        disabled: None,
        workload: Some(workload),
        service: service_section,
    }
}

fn infer_workload_kind(service: &ServiceConfig) -> Option<&'static str> {
    if service.is_global() {
        Some("DaemonSet")
    } else if !service.volumes.is_empty() {
        Some("StatefulSet")
    } else {
        None
    }
}

fn infer_restart_policy(service: &ServiceConfig) -> Option<&'static str> {
    let from_deploy = service
        .deploy
        .as_ref()
        .and_then(|d| d.restart_policy.as_ref())
        .and_then(|p| p.condition.as_deref())
        .and_then(|condition| match condition {
            "none" => Some("Never"),
            "on-failure" => Some("OnFailure"),
            "any" => Some("Always"),
            _ => None,
        });

    from_deploy.or_else(|| {
        service.restart.as_deref().and_then(|restart| {
            // `on-failure:3` carries a retry count we cannot express
            match restart.split(':').next().unwrap_or_default() {
                "no" => Some("Never"),
                "always" | "unless-stopped" => Some("Always"),
                "on-failure" => Some("OnFailure"),
                _ => None,
            }
        })
    })
}

fn infer_pull_policy(pull_policy: Option<&str>) -> Option<&'static str> {
    match pull_policy? {
        "always" => Some("Always"),
        "never" => Some("Never"),
        "missing" | "if_not_present" => Some("IfNotPresent"),
        _ => None,
    }
}

fn infer_rolling_update(service: &ServiceConfig) -> Option<RollingUpdateOverride> {
    let update = service.deploy.as_ref()?.update_config.as_ref()?;
    let parallelism = update.parallelism.filter(|p| *p > 0);

    match update.order.as_deref().unwrap_or("stop-first") {
        "start-first" => Some(RollingUpdateOverride {
            max_surge: parallelism,
            max_unavailable: Some(0),
        }),
        _ => Some(RollingUpdateOverride {
            max_surge: Some(0),
            max_unavailable: parallelism,
        }),
    }
}

/// Maps a Compose healthcheck to an exec probe.
fn infer_probe(healthcheck: &HealthCheckConfig) -> Option<ProbeOverride> {
    if healthcheck.disable {
        return Some(disabled_probe());
    }

    let command = match healthcheck.test.as_ref()? {
        StringOrList::String(shell) => shell_command(shell),
        StringOrList::List(parts) => match parts.split_first() {
            Some((first, _)) if first == "NONE" => return Some(disabled_probe()),
            Some((first, rest)) if first == "CMD-SHELL" => shell_command(&rest.join(" ")),
            Some((first, rest)) if first == "CMD" => rest.to_vec(),
            _ => parts.clone(),
        },
    };

    Some(ProbeOverride {
        kind: Some(String::from("exec")),
        exec: Some(ExecProbeOverride {
            command: Some(command),
        }),
        initial_delay: healthcheck.start_period.clone(),
        period: healthcheck.interval.clone(),
        timeout: healthcheck.timeout.clone(),
        failure_threshold: healthcheck.retries.filter(|r| *r > 0),
        ..ProbeOverride::default()
    })
}

fn shell_command(script: &str) -> Vec<String> {
    vec![
        String::from("/bin/sh"),
        String::from("-c"),
        script.to_string(),
    ]
}

fn disabled_probe() -> ProbeOverride {
    ProbeOverride {
        kind: Some(String::from("none")),
        ..ProbeOverride::default()
    }
}

fn infer_resources(service: &ServiceConfig) -> Option<ResourcesOverride> {
    let resources = service.deploy.as_ref()?.resources.as_ref()?;
    let reservations = resources.reservations.as_ref();
    let limits = resources.limits.as_ref();

    Some(ResourcesOverride {
        memory: reservations.and_then(|r| r.memory.as_deref()).map(compose_memory),
        max_memory: limits.and_then(|l| l.memory.as_deref()).map(compose_memory),
        cpu: reservations.and_then(|r| r.cpus.clone()),
        max_cpu: limits.and_then(|l| l.cpus.clone()),
        ..ResourcesOverride::default()
    })
}

/// Compose memory as plain bytes; values that are not Compose sizes are
/// passed through for the Kubernetes parser.
fn compose_memory(value: &str) -> String {
    parse_compose_memory_bytes(value).map_or_else(|_| value.to_string(), |bytes| bytes.to_string())
}

fn infer_service_type(service: &ServiceConfig) -> Option<&'static str> {
    let endpoint_mode = service
        .deploy
        .as_ref()
        .and_then(|d| d.endpoint_mode.as_deref());

    if endpoint_mode == Some("dnsrr") {
        Some("Headless")
    } else if !service.ports.is_empty() || !service.expose.is_empty() || endpoint_mode == Some("vip")
    {
        Some("ClusterIP")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(yaml: &str) -> ServiceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_infer_plain_service() {
        let doc = infer_override(&service("image: redis\n"));
        let workload = doc.workload.unwrap();
        assert_eq!(workload.kind, None);
        assert_eq!(workload.replicas, None);
        assert!(doc.service.is_none());
    }

    #[test]
    fn test_infer_workload_kind() {
        let stateful = infer_override(&service("volumes: [\"data:/data\"]\n"));
        assert_eq!(
            stateful.workload.unwrap().kind.as_deref(),
            Some("StatefulSet")
        );

        let global = infer_override(&service(
            "volumes: [\"data:/data\"]\ndeploy:\n  mode: global\n",
        ));
        assert_eq!(global.workload.unwrap().kind.as_deref(), Some("DaemonSet"));
    }

    #[test]
    fn test_infer_restart_policy() {
        let doc = infer_override(&service("restart: \"no\"\n"));
        assert_eq!(doc.workload.unwrap().restart_policy.as_deref(), Some("Never"));

        let doc = infer_override(&service(
            "restart: always\ndeploy:\n  restart_policy:\n    condition: on-failure\n",
        ));
        assert_eq!(
            doc.workload.unwrap().restart_policy.as_deref(),
            Some("OnFailure")
        );
    }

    #[test]
    fn test_infer_healthcheck() {
        let doc = infer_override(&service(
            "healthcheck:\n  test: [\"CMD-SHELL\", \"pg_isready -U app\"]\n  interval: 10s\n  retries: 5\n",
        ));
        let probe = doc.workload.unwrap().liveness_probe.unwrap();
        assert_eq!(probe.kind.as_deref(), Some("exec"));
        assert_eq!(
            probe.exec.unwrap().command.unwrap(),
            vec!["/bin/sh", "-c", "pg_isready -U app"]
        );
        assert_eq!(probe.period.as_deref(), Some("10s"));
        assert_eq!(probe.failure_threshold, Some(5));

        let disabled = infer_override(&service("healthcheck:\n  test: [\"NONE\"]\n"));
        assert_eq!(
            disabled.workload.unwrap().liveness_probe.unwrap().kind.as_deref(),
            Some("none")
        );
    }

    #[test]
    fn test_infer_rolling_update() {
        let doc = infer_override(&service(
            "deploy:\n  update_config:\n    parallelism: 2\n    order: start-first\n",
        ));
        let update = doc.workload.unwrap().rolling_update.unwrap();
        assert_eq!(update.max_surge, Some(2));
        assert_eq!(update.max_unavailable, Some(0));
    }

    #[test]
    fn test_infer_service_type() {
        let doc = infer_override(&service("ports: [\"8080:80\"]\n"));
        assert_eq!(doc.service.unwrap().kind.as_deref(), Some("ClusterIP"));

        let doc = infer_override(&service("deploy:\n  endpoint_mode: dnsrr\n"));
        assert_eq!(doc.service.unwrap().kind.as_deref(), Some("Headless"));
    }

    #[test]
    fn test_infer_resources_and_pull_policy() {
        let doc = infer_override(&service(
            "pull_policy: always\ndeploy:\n  resources:\n    limits:\n      cpus: \"0.5\"\n      memory: 512M\n    reservations:\n      memory: 128M\n",
        ));
        let workload = doc.workload.unwrap();
        let resources = workload.resources.unwrap();
        assert_eq!(resources.max_cpu.as_deref(), Some("0.5"));
        assert_eq!(resources.max_memory.as_deref(), Some("536870912"));
        assert_eq!(resources.memory.as_deref(), Some("134217728"));
        assert_eq!(
            workload.image_pull.unwrap().policy.as_deref(),
            Some("Always")
        );
    }
}
