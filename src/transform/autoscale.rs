//! HorizontalPodAutoscaler synthesis.

use crate::k8s::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HpaSpec, LABEL_SERVICE, MetricSpec,
    ObjectMeta, Workload,
};
use crate::project::ProjectService;

/// Builds the autoscaler of a workload.
///
/// An autoscaler exists only if the maximum replica count is positive and
/// above the desired replica count (at least one).
#[must_use]
pub fn build_autoscaler(
    service: &ProjectService<'_>,
    workload: &Workload,
    namespace: Option<&str>,
) -> Option<HorizontalPodAutoscaler> {
    let autoscale = service.config().workload.autoscale;
    let min_replicas = service.replicas().max(1);
    if autoscale.max_replicas == 0 || autoscale.max_replicas <= min_replicas {
        return None;
    }

    let target = workload.metadata();
    Some(HorizontalPodAutoscaler::new(
        ObjectMeta::new(target.name.as_str(), namespace)
            .with_label(LABEL_SERVICE, target.name.as_str()),
        HpaSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: workload.api_version().to_string(),
                kind: workload.kind().to_string(),
                name: target.name.clone(),
            },
            min_replicas,
            max_replicas: autoscale.max_replicas,
            metrics: vec![
                MetricSpec::utilization("cpu", autoscale.cpu_threshold),
                MetricSpec::utilization("memory", autoscale.mem_threshold),
            ],
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ServiceConfig;
    use crate::config::{ConfigResolver, K8sOverride};
    use crate::diagnostics::Diagnostics;
    use crate::k8s::PodTemplateSpec;
    use crate::transform::workload::build_workload;

    fn hpa(yaml: &str) -> Option<HorizontalPodAutoscaler> {
        let compose: ServiceConfig = serde_yaml::from_str(yaml).unwrap();
        let config =
            ConfigResolver::resolve("web", &compose, compose.k8s.as_ref(), &K8sOverride::default())
                .unwrap();
        let view = ProjectService::new("web", &compose, config);
        let mut diagnostics = Diagnostics::new();
        let kind = view.workload_type(&mut diagnostics);
        let workload = build_workload(&view, kind, PodTemplateSpec::default(), None, &mut diagnostics);
        build_autoscaler(&view, &workload, None)
    }

    #[test]
    fn test_hpa_gating() {
        assert!(hpa("image: web\n").is_none());
        assert!(hpa("x-k8s:\n  workload:\n    autoscale:\n      maxReplicas: 1\n").is_none());
        assert!(
            hpa("x-k8s:\n  workload:\n    replicas: 5\n    autoscale:\n      maxReplicas: 5\n")
                .is_none()
        );
        assert!(hpa("x-k8s:\n  workload:\n    replicas: 0\n    autoscale:\n      maxReplicas: 2\n").is_some());
    }

    #[test]
    fn test_hpa_targets_workload() {
        let hpa = hpa(
            "x-k8s:\n  workload:\n    replicas: 2\n    autoscale:\n      maxReplicas: 10\n      cpuThreshold: 80\n",
        )
        .unwrap();
        assert_eq!(hpa.api_version, "autoscaling/v2beta2");
        assert_eq!(hpa.spec.scale_target_ref.kind, "Deployment");
        assert_eq!(hpa.spec.scale_target_ref.api_version, "apps/v1");
        assert_eq!(hpa.spec.min_replicas, 2);
        assert_eq!(hpa.spec.max_replicas, 10);
        assert_eq!(hpa.spec.metrics[0].resource.target.average_utilization, 80);
        assert_eq!(hpa.spec.metrics[1].resource.target.average_utilization, 70);
    }
}
