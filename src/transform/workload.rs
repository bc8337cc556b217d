//! Workload synthesis.

use tracing::debug;

use crate::config::{RestartPolicy, RollingUpdateConfig, WorkloadKind};
use crate::diagnostics::Diagnostics;
use crate::k8s::{
    DaemonSet, DaemonSetSpec, Deployment, DeploymentSpec, DeploymentStrategy, Job, JobSpec,
    LABEL_SERVICE, LabelSelector, ObjectMeta, PodTemplateSpec, RollingUpdate, StatefulSet,
    StatefulSetSpec, StatefulSetUpdateStrategy, Workload, normalize_name,
};
use crate::project::ProjectService;

const ROLLING_UPDATE: &str = "RollingUpdate";

/// Wraps `template` into the workload of the given kind.
///
/// Long-running workloads always restart their pods; a Job keeps `Never`
/// or `OnFailure` and turns `Always` into `OnFailure`.
pub fn build_workload(
    service: &ProjectService<'_>,
    kind: WorkloadKind,
    mut template: PodTemplateSpec,
    namespace: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Workload {
    let workload = &service.config().workload;
    let name = normalize_name(service.name());

    let restart_policy = match (kind, workload.restart_policy) {
        (WorkloadKind::Job, RestartPolicy::Always) => RestartPolicy::OnFailure,
        (WorkloadKind::Job, policy) => policy,
        (_, RestartPolicy::Always) => RestartPolicy::Always,
        (_, policy) => {
            diagnostics.warn(
                Some(service.name()),
                format!("restart policy {policy} is not supported by a {kind}; using Always"),
            );
            RestartPolicy::Always
        }
    };
    template.spec.restart_policy = Some(restart_policy.to_string());

    let metadata = ObjectMeta::new(name.as_str(), namespace)
        .with_label(LABEL_SERVICE, name.as_str())
        .with_annotations(&workload.annotations);
    let selector = LabelSelector::single(LABEL_SERVICE, name.as_str());
    let replicas = workload.replicas;

    debug!(service = service.name(), %kind, replicas, "Built workload");
    match kind {
        WorkloadKind::Deployment => Workload::Deployment(Deployment::new(
            metadata,
            DeploymentSpec {
                replicas,
                selector,
                template,
                strategy: workload.rolling_update.map(|update| DeploymentStrategy {
                    type_: ROLLING_UPDATE.to_string(),
                    rolling_update: Some(rolling_update(update)),
                }),
            },
        )),
        WorkloadKind::StatefulSet => Workload::StatefulSet(StatefulSet::new(
            metadata,
            StatefulSetSpec {
                replicas,
                service_name: name.clone(),
                selector,
                template,
                update_strategy: workload.rolling_update.map(|update| {
                    StatefulSetUpdateStrategy {
                        type_: ROLLING_UPDATE.to_string(),
                        rolling_update: Some(rolling_update(update)),
                    }
                }),
            },
        )),
        WorkloadKind::DaemonSet => {
            Workload::DaemonSet(DaemonSet::new(metadata, DaemonSetSpec { selector, template }))
        }
        WorkloadKind::Job => Workload::Job(Job::new(
            metadata,
            JobSpec {
                parallelism: replicas,
                completions: replicas,
                template,
            },
        )),
    }
}

const fn rolling_update(update: RollingUpdateConfig) -> RollingUpdate {
    RollingUpdate {
        max_surge: update.max_surge,
        max_unavailable: update.max_unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ServiceConfig;
    use crate::config::{ConfigResolver, K8sOverride};

    fn build(name: &str, yaml: &str) -> (Workload, Diagnostics) {
        let compose: ServiceConfig = serde_yaml::from_str(yaml).unwrap();
        let config =
            ConfigResolver::resolve(name, &compose, compose.k8s.as_ref(), &K8sOverride::default())
                .unwrap();
        let view = ProjectService::new(name, &compose, config);
        let mut diagnostics = Diagnostics::new();
        let kind = view.workload_type(&mut diagnostics);
        let workload = build_workload(&view, kind, PodTemplateSpec::default(), None, &mut diagnostics);
        (workload, diagnostics)
    }

    #[test]
    fn test_default_deployment() {
        let (workload, diagnostics) = build("db", "image: postgres\n");
        assert!(diagnostics.is_empty());
        match workload {
            Workload::Deployment(d) => {
                assert_eq!(d.spec.replicas, 1);
                assert!(d.spec.strategy.is_none());
                assert_eq!(d.spec.template.spec.restart_policy.as_deref(), Some("Always"));
            }
            other => panic!("unexpected workload: {}", other.kind()),
        }
    }

    #[test]
    fn test_restart_forced_to_always_with_warning() {
        let (workload, diagnostics) = build("web", "restart: \"no\"\n");
        assert_eq!(
            workload.pod_template().spec.restart_policy.as_deref(),
            Some("Always")
        );
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn test_job_parallelism_and_restart() {
        let (workload, _) = build(
            "migrate",
            "x-k8s:\n  workload:\n    type: Job\n    replicas: 3\n",
        );
        match workload {
            Workload::Job(job) => {
                assert_eq!(job.spec.parallelism, 3);
                assert_eq!(job.spec.completions, 3);
                assert_eq!(job.spec.template.spec.restart_policy.as_deref(), Some("OnFailure"));
            }
            other => panic!("unexpected workload: {}", other.kind()),
        }
    }

    #[test]
    fn test_stop_first_strategy() {
        let (workload, _) = build(
            "web",
            "deploy:\n  replicas: 4\n  update_config:\n    parallelism: 2\n    order: stop-first\n",
        );
        match workload {
            Workload::Deployment(d) => {
                let update = d.spec.strategy.unwrap().rolling_update.unwrap();
                assert_eq!(update.max_surge, Some(0));
                assert_eq!(update.max_unavailable, Some(2));
            }
            other => panic!("unexpected workload: {}", other.kind()),
        }
    }

    #[test]
    fn test_statefulset_carries_service_name() {
        let (workload, _) = build("db", "volumes: [\"data:/var/lib/data\"]\n");
        match workload {
            Workload::StatefulSet(s) => assert_eq!(s.spec.service_name, "db"),
            other => panic!("unexpected workload: {}", other.kind()),
        }
    }
}
