//! Environment variable expansion.
//!
//! Compose values are turned into container `env` entries. A value may be a
//! literal, a reference to a Secret or ConfigMap key, a pod field or a
//! container resource, or a literal that interpolates other variables with
//! `{{NAME}}`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::compose::Environment;
use crate::diagnostics::Diagnostics;
use crate::error::EnvError;
use crate::k8s::{EnvVar, EnvVarSource, FieldSelector, KeySelector, ResourceFieldSelector};

/// Pod fields that may be referenced with `pod.<path>`.
pub const POD_FIELD_PATHS: &[&str] = &[
    "metadata.name",
    "metadata.namespace",
    "metadata.labels",
    "metadata.annotations",
    "spec.nodeName",
    "spec.serviceAccountName",
    "status.hostIP",
    "status.podIP",
    "status.podIPs",
];

/// Container resources that may be referenced with `container.<name>.<path>`.
pub const CONTAINER_RESOURCE_PATHS: &[&str] = &[
    "limits.cpu",
    "limits.memory",
    "limits.ephemeral-storage",
    "requests.cpu",
    "requests.memory",
    "requests.ephemeral-storage",
];

/// Expander bound to the invoking environment snapshot.
#[derive(Debug, Clone, Copy)]
pub struct EnvExpander<'a> {
    snapshot: &'a BTreeMap<String, String>,
}

impl<'a> EnvExpander<'a> {
    /// Creates an expander that fills unset variables from `snapshot`.
    #[must_use]
    pub const fn new(snapshot: &'a BTreeMap<String, String>) -> Self {
        Self { snapshot }
    }

    /// Expands a service environment into container variables.
    ///
    /// Plain and reference variables come first, sorted by name. Variables
    /// interpolating others follow in declaration order so that the
    /// variables they depend on are defined before them.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed references and for pod or container
    /// paths outside the allow-lists.
    pub fn expand(
        &self,
        service: &str,
        environment: &Environment,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<EnvVar>, EnvError> {
        let mut plain = Vec::new();
        let mut interpolating = Vec::new();

        for (name, value) in environment.iter() {
            let value = match value {
                Some(value) => value.clone(),
                None => match self.snapshot.get(name) {
                    Some(value) => value.clone(),
                    None => {
                        diagnostics.warn(
                            Some(service),
                            format!("environment variable '{name}' has no value and is not set in the environment; dropped"),
                        );
                        continue;
                    }
                },
            };

            if let Some(var) = reference(name, &value)? {
                plain.push(var);
            } else if value.contains("{{") {
                interpolating.push(EnvVar::literal(name.as_str(), interpolate(&value)));
            } else {
                plain.push(EnvVar::literal(name.as_str(), value));
            }
        }

        plain.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(
            service,
            plain = plain.len(),
            interpolating = interpolating.len(),
            "Expanded environment"
        );
        plain.extend(interpolating);
        Ok(plain)
    }
}

/// Builds a reference variable, or `None` for literal values.
fn reference(name: &str, value: &str) -> Result<Option<EnvVar>, EnvError> {
    let malformed = |reason: &str| EnvError::MalformedReference {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let Some((prefix, rest)) = value.split_once('.') else {
        return Ok(None);
    };

    let source = match prefix {
        "secret" | "config" => {
            let (object, key) = rest
                .split_once('.')
                .filter(|(o, k)| !o.is_empty() && !k.is_empty())
                .ok_or_else(|| malformed("expected <kind>.<name>.<key>"))?;
            let selector = KeySelector {
                name: object.to_string(),
                key: key.to_string(),
            };
            if prefix == "secret" {
                EnvVarSource {
                    secret_key_ref: Some(selector),
                    ..EnvVarSource::default()
                }
            } else {
                EnvVarSource {
                    config_map_key_ref: Some(selector),
                    ..EnvVarSource::default()
                }
            }
        }
        "pod" => {
            if !POD_FIELD_PATHS.contains(&rest) {
                return Err(EnvError::UnsupportedFieldPath {
                    name: name.to_string(),
                    path: rest.to_string(),
                });
            }
            EnvVarSource {
                field_ref: Some(FieldSelector {
                    field_path: rest.to_string(),
                }),
                ..EnvVarSource::default()
            }
        }
        "container" => {
            let (container, path) = rest
                .split_once('.')
                .filter(|(c, p)| !c.is_empty() && !p.is_empty())
                .ok_or_else(|| malformed("expected container.<name>.<resource>"))?;
            if !CONTAINER_RESOURCE_PATHS.contains(&path) {
                return Err(EnvError::UnsupportedResourcePath {
                    name: name.to_string(),
                    path: path.to_string(),
                });
            }
            EnvVarSource {
                resource_field_ref: Some(ResourceFieldSelector {
                    container_name: container.to_string(),
                    resource: path.to_string(),
                }),
                ..EnvVarSource::default()
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(EnvVar::from_source(name, source)))
}

/// Rewrites `{{NAME}}` into the Kubernetes `$(NAME)` form.
fn interpolate(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str("$(");
        out.push_str(rest[start + 2..start + 2 + len].trim());
        out.push(')');
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(yaml: &str) -> Environment {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn expand(yaml: &str) -> Result<Vec<EnvVar>, EnvError> {
        let snapshot = BTreeMap::new();
        EnvExpander::new(&snapshot).expand("web", &env(yaml), &mut Diagnostics::new())
    }

    #[test]
    fn test_literals_sorted_then_interpolating() {
        let vars = expand("ZETA: z\nURL: \"http://{{HOST}}:{{ PORT }}\"\nALPHA: a\nHOST: db\n")
            .unwrap();
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["ALPHA", "HOST", "ZETA", "URL"]);
        assert_eq!(vars[3].value.as_deref(), Some("http://$(HOST):$(PORT)"));
    }

    #[test]
    fn test_secret_and_config_references() {
        let vars = expand("PASSWORD: secret.db-creds.password\nCFG: config.app.settings.json\n")
            .unwrap();
        let cfg = vars[0].value_from.as_ref().unwrap().config_map_key_ref.as_ref().unwrap();
        assert_eq!(cfg.name, "app");
        assert_eq!(cfg.key, "settings.json");
        let secret = vars[1].value_from.as_ref().unwrap().secret_key_ref.as_ref().unwrap();
        assert_eq!(secret.name, "db-creds");
        assert_eq!(secret.key, "password");
    }

    #[test]
    fn test_malformed_reference() {
        assert!(matches!(
            expand("PASSWORD: secret.only-name\n"),
            Err(EnvError::MalformedReference { .. })
        ));
    }

    #[test]
    fn test_pod_and_container_allow_lists() {
        let vars = expand("NODE: pod.spec.nodeName\nMEM: container.web.limits.memory\n").unwrap();
        let mem = vars[0].value_from.as_ref().unwrap().resource_field_ref.as_ref().unwrap();
        assert_eq!(mem.container_name, "web");
        assert_eq!(mem.resource, "limits.memory");
        assert_eq!(
            vars[1].value_from.as_ref().unwrap().field_ref.as_ref().unwrap().field_path,
            "spec.nodeName"
        );

        assert!(matches!(
            expand("X: pod.spec.containers\n"),
            Err(EnvError::UnsupportedFieldPath { .. })
        ));
        assert!(matches!(
            expand("X: container.web.limits.gpu\n"),
            Err(EnvError::UnsupportedResourcePath { .. })
        ));
    }

    #[test]
    fn test_unset_values_use_snapshot_or_drop() {
        let mut snapshot = BTreeMap::new();
        snapshot.insert(String::from("TOKEN"), String::from("abc"));
        let mut diagnostics = Diagnostics::new();
        let vars = EnvExpander::new(&snapshot)
            .expand("web", &env("- TOKEN\n- MISSING\n"), &mut diagnostics)
            .unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].value.as_deref(), Some("abc"));
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn test_plain_dotted_values_are_literal() {
        let vars = expand("HOST: db.internal\nVERSION: \"1.2\"\n").unwrap();
        assert_eq!(vars[0].value.as_deref(), Some("db.internal"));
        assert_eq!(vars[1].value.as_deref(), Some("1.2"));
    }
}
