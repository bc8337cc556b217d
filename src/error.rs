//! Error types for the kubecompose conversion engine.
//!
//! This module provides the error hierarchy for every stage of a conversion
//! run: loading the Compose project, resolving per-service configuration,
//! resolving volumes, expanding environment variables and synthesizing
//! Kubernetes objects.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the kubecompose engine.
#[derive(Debug, Error)]
pub enum KubeComposeError {
    /// Compose project loading errors.
    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    /// Override decoding and validation errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Volume resolution errors.
    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),

    /// Environment variable expansion errors.
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    /// Object synthesis errors.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Some services could not be converted or validated.
    #[error("{failed} of {total} service(s) failed")]
    ServicesFailed {
        /// Number of failed services.
        failed: usize,
        /// Number of services in the project.
        total: usize,
    },

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while loading a Compose project document.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The Compose file was not found.
    #[error("Compose file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The Compose document could not be parsed.
    #[error("Failed to parse compose project: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// An environment block could not be understood.
    #[error("Invalid environment entry: {entry}")]
    InvalidEnvironment {
        /// The offending entry.
        entry: String,
    },
}

/// Override decoding, validation and ambiguity errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The override document could not be decoded.
    #[error("Service '{service}': failed to decode override: {message}")]
    ParseError {
        /// Service the document belongs to (`<project>` for project-wide).
        service: String,
        /// Description of the decode error.
        message: String,
    },

    /// A field failed validation.
    #[error("Service '{service}': invalid value for '{field}': {message}")]
    ValidationError {
        /// Service being resolved.
        service: String,
        /// Field path that failed validation.
        field: String,
        /// Description of the validation error.
        message: String,
    },

    /// Two settings contradict each other.
    #[error("Service '{service}': {message}")]
    Ambiguous {
        /// Service being resolved.
        service: String,
        /// Description of the conflict.
        message: String,
    },
}

/// Volume resolution errors.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// A mount entry could not be parsed.
    #[error("Service '{service}': invalid volume mount '{spec}': {reason}")]
    InvalidMount {
        /// Owning service.
        service: String,
        /// The mount entry as written.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `volumes_from` names a service that does not exist.
    #[error("Service '{service}' inherits volumes from unknown service '{dependency}'")]
    UnknownService {
        /// Inheriting service.
        service: String,
        /// Missing dependency.
        dependency: String,
    },

    /// `volumes_from` forms a cycle.
    #[error("Circular volume inheritance detected: {cycle}")]
    CircularInheritance {
        /// Description of the cycle.
        cycle: String,
    },

    /// A named volume override could not be decoded.
    #[error("Volume '{volume}': failed to decode override: {message}")]
    InvalidOverride {
        /// Top-level volume name.
        volume: String,
        /// Description of the decode error.
        message: String,
    },
}

/// Environment variable expansion errors.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A `secret.` / `config.` / `container.` reference is missing parts.
    #[error("Variable '{name}': malformed reference '{value}': {reason}")]
    MalformedReference {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A `pod.` reference names a field outside the allow-list.
    #[error("Variable '{name}': unsupported pod field path '{path}'")]
    UnsupportedFieldPath {
        /// Variable name.
        name: String,
        /// Requested field path.
        path: String,
    },

    /// A `container.` reference names a resource outside the allow-list.
    #[error("Variable '{name}': unsupported container resource path '{path}'")]
    UnsupportedResourcePath {
        /// Variable name.
        name: String,
        /// Requested resource path.
        path: String,
    },
}

/// Object synthesis errors.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Neither the service nor its name yields an image.
    #[error("Service '{service}' has no image")]
    MissingImage {
        /// Service name.
        service: String,
    },

    /// A referenced local file could not be read.
    #[error("Failed to read '{path}': {message}")]
    FileRead {
        /// File path.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },

    /// A service references a secret absent from the top-level map.
    #[error("Service '{service}' references undeclared secret '{name}'")]
    UndeclaredSecret {
        /// Service name.
        service: String,
        /// Secret name.
        name: String,
    },

    /// A service references a config absent from the top-level map.
    #[error("Service '{service}' references undeclared config '{name}'")]
    UndeclaredConfig {
        /// Service name.
        service: String,
        /// Config name.
        name: String,
    },

    /// A resource quantity could not be parsed.
    #[error("Service '{service}': invalid {field} quantity '{value}'")]
    InvalidQuantity {
        /// Service name.
        service: String,
        /// Resource field (e.g. `cpu limit`).
        field: String,
        /// Raw quantity.
        value: String,
    },

    /// Synthesis of one service failed; other services are unaffected.
    #[error("Failed to transform service '{service}': {source}")]
    Service {
        /// Service name.
        service: String,
        /// Underlying failure.
        #[source]
        source: Box<KubeComposeError>,
    },
}

/// Result type alias for kubecompose operations.
pub type Result<T> = std::result::Result<T, KubeComposeError>;

impl KubeComposeError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Creates the error reported when services failed to convert.
    #[must_use]
    pub const fn services_failed(failed: usize, total: usize) -> Self {
        Self::ServicesFailed { failed, total }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(
        service: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ValidationError {
            service: service.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an ambiguity error.
    #[must_use]
    pub fn ambiguous(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ambiguous {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns the field path for validation errors.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationError { field, .. } => Some(field.as_str()),
            Self::ParseError { .. } | Self::Ambiguous { .. } => None,
        }
    }
}

impl TransformError {
    /// Wraps an error with the name of the service being transformed.
    #[must_use]
    pub fn service(service: impl Into<String>, source: impl Into<KubeComposeError>) -> Self {
        Self::Service {
            service: service.into(),
            source: Box::new(source.into()),
        }
    }

    /// Creates a file read error.
    #[must_use]
    pub fn file_read(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            message: error.to_string(),
        }
    }

    /// Returns the service name for service-wrapped failures.
    #[must_use]
    pub fn service_name(&self) -> Option<&str> {
        match self {
            Self::Service { service, .. } => Some(service.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_wrapper_keeps_source() {
        let inner = TransformError::MissingImage {
            service: String::from("web"),
        };
        let wrapped = TransformError::service("web", inner);
        assert_eq!(wrapped.service_name(), Some("web"));
        assert!(wrapped.to_string().contains("has no image"));
    }

    #[test]
    fn test_services_failed_message() {
        let err = KubeComposeError::services_failed(2, 5);
        assert!(matches!(err, KubeComposeError::ServicesFailed { failed: 2, total: 5 }));
        assert_eq!(err.to_string(), "2 of 5 service(s) failed");
    }

    #[test]
    fn test_validation_field() {
        let err = ConfigError::validation("api", "workload.type", "unknown workload type");
        assert_eq!(err.field(), Some("workload.type"));
        assert!(err.to_string().contains("api"));
    }
}
