//! Final pass over the synthesized object set.

use std::collections::HashSet;

use tracing::debug;

use crate::k8s::KubernetesObject;

/// Deduplicates and orders the object set.
///
/// Objects sharing (kind, namespace, name) keep their first occurrence.
/// Service objects are then moved in front of everything else; the relative
/// order inside both groups is preserved.
#[must_use]
pub fn postprocess(objects: Vec<KubernetesObject>) -> Vec<KubernetesObject> {
    let total = objects.len();
    let mut seen = HashSet::new();
    let unique: Vec<KubernetesObject> = objects
        .into_iter()
        .filter(|object| seen.insert(object.key()))
        .collect();

    if unique.len() != total {
        debug!(dropped = total - unique.len(), "Removed duplicate objects");
    }

    let (mut services, others): (Vec<_>, Vec<_>) =
        unique.into_iter().partition(KubernetesObject::is_service);
    services.extend(others);
    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::{ConfigMap, ObjectMeta, Service, ServiceSpec};

    fn config_map(name: &str, value: &str) -> KubernetesObject {
        KubernetesObject::ConfigMap(ConfigMap::new(ObjectMeta::new(name, None)).with_data("k", value))
    }

    fn service(name: &str) -> KubernetesObject {
        KubernetesObject::Service(Service::new(ObjectMeta::new(name, None), ServiceSpec::default()))
    }

    #[test]
    fn test_first_occurrence_wins() {
        let objects = postprocess(vec![config_map("a", "first"), config_map("a", "second")]);
        assert_eq!(objects.len(), 1);
        match &objects[0] {
            KubernetesObject::ConfigMap(cm) => {
                assert_eq!(cm.data.get("k").map(String::as_str), Some("first"));
            }
            other => panic!("unexpected object: {}", other.kind()),
        }
    }

    #[test]
    fn test_services_first_stable() {
        let objects = postprocess(vec![
            config_map("x", "1"),
            service("b"),
            config_map("y", "1"),
            service("a"),
        ]);
        let names: Vec<(&str, &str)> = objects.iter().map(|o| (o.kind(), o.name())).collect();
        assert_eq!(
            names,
            vec![
                ("Service", "b"),
                ("Service", "a"),
                ("ConfigMap", "x"),
                ("ConfigMap", "y"),
            ]
        );
    }

    #[test]
    fn test_same_name_different_kind_kept() {
        let objects = postprocess(vec![config_map("web", "1"), service("web")]);
        assert_eq!(objects.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let once = postprocess(vec![service("a"), config_map("a", "1"), service("a")]);
        let twice = postprocess(once.clone());
        assert_eq!(once, twice);
    }
}
