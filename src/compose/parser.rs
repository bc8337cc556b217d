//! Loader for normalized Compose project documents.
//!
//! This module reads a Compose project from a YAML file or string and
//! records the directory relative file references resolve against. It does
//! not perform variable interpolation or multi-file merging.

use crate::error::{ComposeError, KubeComposeError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::Project;

/// Parser for Compose project documents.
#[derive(Debug, Default)]
pub struct ComposeParser {
    /// Base path for resolving relative file references.
    base_path: Option<PathBuf>,
}

impl ComposeParser {
    /// Creates a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a project from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Project> {
        let path = path.as_ref();
        info!("Loading compose project from: {}", path.display());

        if !path.exists() {
            return Err(KubeComposeError::Compose(ComposeError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            KubeComposeError::Compose(ComposeError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let mut project = self.parse_yaml(&content, Some(path))?;
        if self.base_path.is_none() {
            project.working_dir = path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        }
        Ok(project)
    }

    /// Parses a project from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Project> {
        debug!("Parsing compose YAML");

        let mut project: Project = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            KubeComposeError::Compose(ComposeError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        project.working_dir = self
            .base_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        debug!(
            "Parsed compose project with {} services",
            project.services.len()
        );
        Ok(project)
    }

    /// Builds the invoking-environment snapshot used to fill variables that
    /// are declared without a value.
    ///
    /// The process environment is read first; entries of the optional
    /// dotenv file override it. The process environment is never modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the dotenv file exists but cannot be parsed.
    pub fn environment_snapshot(&self, env_file: Option<&Path>) -> Result<BTreeMap<String, String>> {
        let mut snapshot: BTreeMap<String, String> = std::env::vars().collect();

        let env_path = env_file.map_or_else(
            || {
                self.base_path
                    .as_ref()
                    .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"))
            },
            Path::to_path_buf,
        );

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            let entries = dotenvy::from_path_iter(&env_path).map_err(|e| {
                KubeComposeError::Compose(ComposeError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
            for entry in entries {
                let (key, value) = entry.map_err(|e| {
                    KubeComposeError::Compose(ComposeError::InvalidEnvironment {
                        entry: e.to_string(),
                    })
                })?;
                snapshot.insert(key, value);
            }
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(snapshot)
    }
}

/// Default Compose file names to search for.
pub const DEFAULT_COMPOSE_FILES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Finds the Compose file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no Compose file is found.
pub fn find_compose_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_COMPOSE_FILES {
            let candidate = current.join(filename);
            if candidate.exists() {
                info!("Found compose file: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(KubeComposeError::Compose(ComposeError::FileNotFound {
        path: start.join(DEFAULT_COMPOSE_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_project() {
        let yaml = r"
services:
  db:
    image: postgres:16
";
        let parser = ComposeParser::new();
        let result = parser.parse_yaml(yaml, None);
        assert!(result.is_ok());

        let project = result.unwrap();
        assert_eq!(project.service_names(), vec!["db"]);
        assert_eq!(
            project.service("db").unwrap().image.as_deref(),
            Some("postgres:16")
        );
    }

    #[test]
    fn test_parse_full_project() {
        let yaml = r#"
name: shop
services:
  web:
    image: nginx:1.27
    ports:
      - "8080:80"
      - target: 443
        published: 8443
    expose:
      - "9000"
    environment:
      - MODE=prod
      - TOKEN
    volumes:
      - data:/var/lib/data
      - ./nginx.conf:/etc/nginx/nginx.conf:ro
    networks: [front]
    deploy:
      mode: replicated
      replicas: 3
      resources:
        limits:
          cpus: 0.5
          memory: 512M
    x-k8s:
      workload:
        replicas: 5
volumes:
  data:
networks:
  front:
secrets:
  token:
    file: ./token.txt
"#;
        let parser = ComposeParser::new().with_base_path("/srv/shop");
        let project = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(project.name.as_deref(), Some("shop"));
        assert_eq!(project.working_dir, PathBuf::from("/srv/shop"));
        assert!(project.volumes.contains_key("data"));
        assert!(project.networks.contains_key("front"));

        let web = project.service("web").unwrap();
        assert_eq!(web.ports.len(), 2);
        assert_eq!(web.ports[1].published, Some(8443));
        assert_eq!(web.expose[0].port, 9000);
        assert_eq!(web.environment.get("MODE"), Some("prod"));
        assert_eq!(web.volumes.len(), 2);
        assert_eq!(
            web.deploy
                .as_ref()
                .and_then(|d| d.resources.as_ref())
                .and_then(|r| r.limits.as_ref())
                .and_then(|l| l.cpus.as_deref()),
            Some("0.5")
        );
        assert!(web.k8s.is_some());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let parser = ComposeParser::new();
        let result = parser.parse_yaml("services: [", None);
        assert!(matches!(
            result,
            Err(KubeComposeError::Compose(ComposeError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_environment_snapshot_reads_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join(".env");
        std::fs::write(&env_path, "KUBECOMPOSE_TEST_SNAPSHOT=from-dotenv\n").unwrap();

        let parser = ComposeParser::new().with_base_path(dir.path());
        let snapshot = parser.environment_snapshot(None).unwrap();
        assert_eq!(
            snapshot.get("KUBECOMPOSE_TEST_SNAPSHOT").map(String::as_str),
            Some("from-dotenv")
        );
    }
}
