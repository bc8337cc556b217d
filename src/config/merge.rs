//! Field-by-field overlay of override documents.
//!
//! Merging `other` into `self` replaces every scalar `other` sets and
//! recurses into nested sections, so a higher-precedence document only
//! changes the fields it mentions.

use std::collections::BTreeMap;

use super::spec::{
    AutoscaleOverride, ExecProbeOverride, ExposeOverride, HttpProbeOverride, ImagePullOverride,
    K8sOverride, PodSecurityOverride, ProbeOverride, ResourcesOverride, RollingUpdateOverride,
    ServiceOverride, TcpProbeOverride, WorkloadOverride,
};

/// Deep overlay of one document onto another.
pub trait Merge {
    /// Overlays `other` onto `self`; values set in `other` win.
    fn merge(&mut self, other: Self);
}

/// Replaces `base` when `other` is set.
fn overlay<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

/// Recurses into `base` when both sides are set.
fn merge_nested<T: Merge>(base: &mut Option<T>, other: Option<T>) {
    match (base.as_mut(), other) {
        (Some(current), Some(incoming)) => current.merge(incoming),
        (None, Some(incoming)) => *base = Some(incoming),
        (_, None) => {}
    }
}

impl Merge for BTreeMap<String, String> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl Merge for K8sOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.disabled, other.disabled);
        merge_nested(&mut self.workload, other.workload);
        merge_nested(&mut self.service, other.service);
    }
}

impl Merge for WorkloadOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.kind, other.kind);
        overlay(&mut self.replicas, other.replicas);
        overlay(&mut self.restart_policy, other.restart_policy);
        overlay(&mut self.service_account_name, other.service_account_name);
        overlay(&mut self.command, other.command);
        overlay(&mut self.command_args, other.command_args);
        merge_nested(&mut self.annotations, other.annotations);
        merge_nested(&mut self.image_pull, other.image_pull);
        merge_nested(&mut self.pod_security, other.pod_security);
        merge_nested(&mut self.rolling_update, other.rolling_update);
        merge_nested(&mut self.liveness_probe, other.liveness_probe);
        merge_nested(&mut self.readiness_probe, other.readiness_probe);
        merge_nested(&mut self.resources, other.resources);
        merge_nested(&mut self.autoscale, other.autoscale);
    }
}

impl Merge for ImagePullOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.policy, other.policy);
        overlay(&mut self.secret, other.secret);
    }
}

impl Merge for PodSecurityOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.run_as_user, other.run_as_user);
        overlay(&mut self.run_as_group, other.run_as_group);
        overlay(&mut self.fs_group, other.fs_group);
    }
}

impl Merge for RollingUpdateOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.max_surge, other.max_surge);
        overlay(&mut self.max_unavailable, other.max_unavailable);
    }
}

impl Merge for ProbeOverride {
    fn merge(&mut self, other: Self) {
        // Without a type, the named action decides the kind.
        let kind = other.kind.or_else(|| {
            if other.exec.is_some() {
                Some(String::from("exec"))
            } else if other.http.is_some() {
                Some(String::from("http"))
            } else if other.tcp.is_some() {
                Some(String::from("tcp"))
            } else {
                None
            }
        });
        overlay(&mut self.kind, kind);
        merge_nested(&mut self.exec, other.exec);
        merge_nested(&mut self.http, other.http);
        merge_nested(&mut self.tcp, other.tcp);
        overlay(&mut self.initial_delay, other.initial_delay);
        overlay(&mut self.period, other.period);
        overlay(&mut self.timeout, other.timeout);
        overlay(&mut self.failure_threshold, other.failure_threshold);
        overlay(&mut self.success_threshold, other.success_threshold);
    }
}

impl Merge for ExecProbeOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.command, other.command);
    }
}

impl Merge for HttpProbeOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.path, other.path);
        overlay(&mut self.port, other.port);
    }
}

impl Merge for TcpProbeOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.port, other.port);
    }
}

impl Merge for ResourcesOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.memory, other.memory);
        overlay(&mut self.max_memory, other.max_memory);
        overlay(&mut self.cpu, other.cpu);
        overlay(&mut self.max_cpu, other.max_cpu);
        overlay(&mut self.storage, other.storage);
        overlay(&mut self.max_storage, other.max_storage);
    }
}

impl Merge for AutoscaleOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.max_replicas, other.max_replicas);
        overlay(&mut self.cpu_threshold, other.cpu_threshold);
        overlay(&mut self.mem_threshold, other.mem_threshold);
    }
}

impl Merge for ServiceOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.kind, other.kind);
        overlay(&mut self.node_port, other.node_port);
        merge_nested(&mut self.expose, other.expose);
    }
}

impl Merge for ExposeOverride {
    fn merge(&mut self, other: Self) {
        overlay(&mut self.domain, other.domain);
        overlay(&mut self.tls_secret, other.tls_secret);
        merge_nested(&mut self.ingress_annotations, other.ingress_annotations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> K8sOverride {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_merge_is_field_by_field() {
        let mut base = doc("workload:\n  replicas: 2\n  resources:\n    cpu: 0.1\n    memory: 64Mi\n");
        base.merge(doc("workload:\n  resources:\n    cpu: 0.5\n"));

        let workload = base.workload.unwrap();
        assert_eq!(workload.replicas, Some(2));
        let resources = workload.resources.unwrap();
        assert_eq!(resources.cpu.as_deref(), Some("0.5"));
        assert_eq!(resources.memory.as_deref(), Some("64Mi"));
    }

    #[test]
    fn test_merge_unset_keeps_base() {
        let mut base = doc("service:\n  type: NodePort\n  nodeport: 30080\n");
        base.merge(K8sOverride::default());
        let service = base.service.unwrap();
        assert_eq!(service.kind.as_deref(), Some("NodePort"));
        assert_eq!(service.node_port, Some(30080));
    }

    #[test]
    fn test_untyped_action_replaces_kind() {
        let mut base = doc(
            "workload:\n  livenessProbe:\n    type: exec\n    exec:\n      command: [\"true\"]\n    period: 10s\n",
        );
        base.merge(doc(
            "workload:\n  livenessProbe:\n    http:\n      path: /health\n      port: 8080\n",
        ));
        let probe = base.workload.unwrap().liveness_probe.unwrap();
        assert_eq!(probe.kind.as_deref(), Some("http"));
        assert_eq!(probe.period.as_deref(), Some("10s"));

        let mut timing_only = doc("workload:\n  livenessProbe:\n    type: tcp\n    tcp:\n      port: 5432\n");
        timing_only.merge(doc("workload:\n  livenessProbe:\n    timeout: 5s\n"));
        let probe = timing_only.workload.unwrap().liveness_probe.unwrap();
        assert_eq!(probe.kind.as_deref(), Some("tcp"));
    }

    #[test]
    fn test_merge_annotations_union() {
        let mut base = doc("workload:\n  annotations:\n    a: \"1\"\n    b: \"2\"\n");
        base.merge(doc("workload:\n  annotations:\n    b: \"3\"\n"));
        let annotations = base.workload.unwrap().annotations.unwrap();
        assert_eq!(annotations.get("a").map(String::as_str), Some("1"));
        assert_eq!(annotations.get("b").map(String::as_str), Some("3"));
    }
}
