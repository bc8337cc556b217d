//! Typed decoding of `x-k8s` override documents.

use serde_yaml::Value;
use tracing::debug;

use crate::error::ConfigError;

use super::spec::{K8sOverride, VolumeOverride};

/// Owner label used in errors for the project-wide document.
pub const PROJECT_SCOPE: &str = "<project>";

/// Decoder for override documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverrideParser;

impl OverrideParser {
    /// Decodes a service-level override document.
    ///
    /// An absent or `null` document decodes to an empty override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] carrying the serde path when the
    /// document has unknown keys or mistyped values.
    pub fn decode(service: &str, value: Option<&Value>) -> Result<K8sOverride, ConfigError> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(K8sOverride::default());
        };
        debug!(service, "Decoding override document");

        let parse_error = |e: serde_yaml::Error| ConfigError::ParseError {
            service: service.to_string(),
            message: e.to_string(),
        };
        // Re-reading from text makes serde_yaml report the key path.
        let text = serde_yaml::to_string(value).map_err(parse_error)?;
        serde_yaml::from_str(&text).map_err(parse_error)
    }

    /// Decodes the project-wide override document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be decoded or sets
    /// `disabled`, which only applies to individual services.
    pub fn decode_project(value: Option<&Value>) -> Result<K8sOverride, ConfigError> {
        let doc = Self::decode(PROJECT_SCOPE, value)?;
        if doc.disabled.is_some() {
            return Err(ConfigError::validation(
                PROJECT_SCOPE,
                "disabled",
                "only allowed on individual services",
            ));
        }
        Ok(doc)
    }

    /// Decodes the override attached to a top-level named volume.
    ///
    /// # Errors
    ///
    /// Returns an error message if the document cannot be decoded.
    pub fn decode_volume(value: Option<&Value>) -> Result<VolumeOverride, String> {
        match value.filter(|v| !v.is_null()) {
            None => Ok(VolumeOverride::default()),
            Some(v) => serde_yaml::from_value(v.clone()).map_err(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_decode_absent() {
        let doc = OverrideParser::decode("web", None).unwrap();
        assert_eq!(doc, K8sOverride::default());
    }

    #[test]
    fn test_decode_error_names_service_and_path() {
        let err = OverrideParser::decode("web", Some(&value("workload:\n  replica: 3\n")))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("web"));
        assert!(message.contains("replica"));
        assert!(OverrideParser::decode("web", Some(&value("workload:\n  replicas: many\n"))).is_err());
    }

    #[test]
    fn test_project_rejects_disabled() {
        let result = OverrideParser::decode_project(Some(&value("disabled: true\n")));
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_decode_volume() {
        let doc = OverrideParser::decode_volume(Some(&value("storageClass: ssd\nsize: 1Gi\n")))
            .unwrap();
        assert_eq!(doc.storage_class.as_deref(), Some("ssd"));
        assert_eq!(doc.size.as_deref(), Some("1Gi"));
    }
}
