//! Secrets and ConfigMaps built from top-level declarations.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::compose::{FileObjectConfig, Project};
use crate::diagnostics::Diagnostics;
use crate::error::TransformError;
use crate::k8s::{ConfigMap, ObjectMeta, Secret, normalize_name};

/// Objects created from the project's `secrets` and `configs` blocks, keyed
/// by declared name.
#[derive(Debug, Clone, Default)]
pub struct FileObjects {
    /// Secrets with local content.
    pub secrets: BTreeMap<String, Secret>,
    /// ConfigMaps with local or inline content.
    pub configs: BTreeMap<String, ConfigMap>,
}

impl FileObjects {
    /// Reads every local secret and config of the project.
    ///
    /// External and source-less declarations are skipped with a warning.
    /// Unreadable files are returned as failures; the remaining objects are
    /// still built.
    pub fn build(
        project: &Project,
        namespace: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> (Self, Vec<TransformError>) {
        let mut objects = Self::default();
        let mut failures = Vec::new();

        for (name, declared) in &project.secrets {
            let Some(file) = local_file(name, "secret", declared, diagnostics) else {
                continue;
            };
            let path = project.working_dir.join(file);
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let meta = ObjectMeta::new(object_name(name, declared), namespace);
                    objects
                        .secrets
                        .insert(name.clone(), Secret::new(meta).with_bytes(name.as_str(), &bytes));
                    debug!(secret = %name, path = %path.display(), "Built secret");
                }
                Err(e) => failures.push(TransformError::file_read(path, &e)),
            }
        }

        for (name, declared) in &project.configs {
            let content = if let Some(content) = declared.content.as_ref().filter(|_| !declared.is_external()) {
                content.clone().into_bytes()
            } else {
                let Some(file) = local_file(name, "config", declared, diagnostics) else {
                    continue;
                };
                let path = project.working_dir.join(file);
                match std::fs::read(&path) {
                    Ok(content) => content,
                    Err(e) => {
                        failures.push(TransformError::file_read(path, &e));
                        continue;
                    }
                }
            };
            let meta = ObjectMeta::new(object_name(name, declared), namespace);
            objects
                .configs
                .insert(name.clone(), ConfigMap::new(meta).with_content(name.as_str(), content));
            debug!(config = %name, "Built config map");
        }

        (objects, failures)
    }
}

/// Kubernetes name of a declared secret or config.
///
/// External objects keep their explicit `name`.
#[must_use]
pub fn object_name(declared_name: &str, declared: &FileObjectConfig) -> String {
    match &declared.name {
        Some(name) if declared.is_external() => name.clone(),
        _ => normalize_name(declared_name),
    }
}

fn local_file<'a>(
    name: &str,
    kind: &str,
    declared: &'a FileObjectConfig,
    diagnostics: &mut Diagnostics,
) -> Option<&'a Path> {
    if declared.is_external() {
        diagnostics.warn(None, format!("{kind} '{name}' is external; it must exist in the cluster"));
        return None;
    }
    let file = declared.file.as_deref().map(Path::new);
    if file.is_none() {
        diagnostics.warn(None, format!("{kind} '{name}' has no local file; skipped"));
    }
    file
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ComposeParser;

    #[test]
    fn test_secrets_and_configs_from_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("db_password.txt"), "hunter2").unwrap();
        std::fs::write(dir.path().join("app.conf"), "debug = true\n").unwrap();

        let project = ComposeParser::new()
            .with_base_path(dir.path())
            .parse_yaml(
                r#"
secrets:
  db_password:
    file: ./db_password.txt
  api_key:
    external: true
configs:
  app_conf:
    file: ./app.conf
  inline:
    content: "x=1"
"#,
                None,
            )
            .unwrap();

        let mut diagnostics = Diagnostics::new();
        let (objects, failures) = FileObjects::build(&project, Some("prod"), &mut diagnostics);
        assert!(failures.is_empty());
        assert_eq!(diagnostics.warnings().count(), 1);

        let secret = &objects.secrets["db_password"];
        assert_eq!(secret.metadata.name, "db-password");
        assert_eq!(
            secret.data.get("db_password").map(String::as_str),
            Some("aHVudGVyMg==")
        );
        assert_eq!(
            objects.configs["app_conf"].data.get("app_conf").map(String::as_str),
            Some("debug = true\n")
        );
        assert_eq!(
            objects.configs["inline"].data.get("inline").map(String::as_str),
            Some("x=1")
        );
    }

    #[test]
    fn test_missing_file_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let project = ComposeParser::new()
            .with_base_path(dir.path())
            .parse_yaml("secrets:\n  gone:\n    file: ./missing.txt\n", None)
            .unwrap();
        let (objects, failures) = FileObjects::build(&project, None, &mut Diagnostics::new());
        assert!(objects.secrets.is_empty());
        assert!(matches!(failures[0], TransformError::FileRead { .. }));
    }
}
