//! Placement constraints to node selectors.

use std::collections::BTreeMap;

use crate::diagnostics::Diagnostics;

/// Node label set on worker nodes.
const WORKER_ROLE_LABEL: &str = "node-role.kubernetes.io/worker";
/// Node label set on control plane nodes.
const MASTER_ROLE_LABEL: &str = "node-role.kubernetes.io/master";

/// Translates Compose placement constraints into a node selector.
///
/// Only equality constraints on the node role, hostname, operating system
/// and node labels have a selector form; anything else is dropped with a
/// warning.
pub fn node_selector(
    service: &str,
    constraints: &[String],
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, String> {
    let mut selector = BTreeMap::new();

    for constraint in constraints {
        match translate(constraint) {
            Some((key, value)) => {
                selector.insert(key, value);
            }
            None => diagnostics.warn(
                Some(service),
                format!("placement constraint '{constraint}' is not supported; dropped"),
            ),
        }
    }
    selector
}

fn translate(constraint: &str) -> Option<(String, String)> {
    let (key, value) = constraint.split_once("==")?;
    let (key, value) = (key.trim(), value.trim());
    if value.is_empty() {
        return None;
    }

    match key {
        "node.role" => match value {
            "worker" => Some((WORKER_ROLE_LABEL.to_string(), String::from("true"))),
            "manager" => Some((MASTER_ROLE_LABEL.to_string(), String::from("true"))),
            _ => None,
        },
        "node.hostname" => Some((String::from("kubernetes.io/hostname"), value.to_string())),
        "engine.labels.operatingsystem" => {
            Some((String::from("kubernetes.io/os"), value.to_string()))
        }
        _ => key
            .strip_prefix("node.labels.")
            .filter(|label| !label.is_empty())
            .map(|label| (label.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_constraints() {
        let constraints = vec![
            String::from("node.role == worker"),
            String::from("node.hostname==node-1"),
            String::from("engine.labels.operatingsystem==linux"),
            String::from("node.labels.zone==eu-1"),
        ];
        let mut diagnostics = Diagnostics::new();
        let selector = node_selector("web", &constraints, &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(selector.get(WORKER_ROLE_LABEL).map(String::as_str), Some("true"));
        assert_eq!(
            selector.get("kubernetes.io/hostname").map(String::as_str),
            Some("node-1")
        );
        assert_eq!(selector.get("kubernetes.io/os").map(String::as_str), Some("linux"));
        assert_eq!(selector.get("zone").map(String::as_str), Some("eu-1"));
    }

    #[test]
    fn test_unsupported_constraints_warn() {
        let constraints = vec![
            String::from("node.role != manager"),
            String::from("node.platform.arch==x86_64"),
        ];
        let mut diagnostics = Diagnostics::new();
        let selector = node_selector("web", &constraints, &mut diagnostics);
        assert!(selector.is_empty());
        assert_eq!(diagnostics.warnings().count(), 2);
    }
}
