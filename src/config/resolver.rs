//! Per-service configuration resolution.
//!
//! Resolution runs three stages: the service override is decoded, the
//! candidate documents are layered onto the system defaults, and the merged
//! document is validated into a [`ResolvedServiceConfig`].

use serde_yaml::Value;
use tracing::debug;

use crate::compose::ServiceConfig;
use crate::error::ConfigError;

use super::infer::infer_override;
use super::merge::Merge;
use super::parser::OverrideParser;
use super::resolved::ResolvedServiceConfig;
use super::spec::{
    AutoscaleOverride, ImagePullOverride, K8sOverride, ServiceOverride, WorkloadOverride,
};
use super::validator::{ConfigValidator, DEFAULT_SERVICE_ACCOUNT, DEFAULT_THRESHOLD};

/// Resolver applying the precedence cascade.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigResolver;

impl ConfigResolver {
    /// Resolves the effective configuration of one service.
    ///
    /// Precedence, highest first: the service override, the project-wide
    /// override, values inferred from the Compose service, system defaults.
    ///
    /// # Errors
    ///
    /// Returns an error naming the service if its override cannot be decoded
    /// or the merged configuration is invalid.
    pub fn resolve(
        service_name: &str,
        compose_service: &ServiceConfig,
        service_override: Option<&Value>,
        project_override: &K8sOverride,
    ) -> Result<ResolvedServiceConfig, ConfigError> {
        let service_doc = OverrideParser::decode(service_name, service_override)?;
        let merged = Self::merge(compose_service, project_override.clone(), service_doc);
        debug!(service = service_name, "Merged override documents");
        ConfigValidator::validate(service_name, &merged)
    }

    /// Layers the candidate documents onto the system defaults.
    #[must_use]
    pub fn merge(
        compose_service: &ServiceConfig,
        project_override: K8sOverride,
        service_override: K8sOverride,
    ) -> K8sOverride {
        let mut merged = Self::defaults();
        merged.merge(infer_override(compose_service));
        merged.merge(project_override);
        merged.merge(service_override);
        merged
    }

    /// System defaults at the bottom of the cascade.
    #[must_use]
    pub fn defaults() -> K8sOverride {
        K8sOverride {
            disabled: Some(false),
            workload: Some(WorkloadOverride {
                kind: Some(String::from("Deployment")),
                replicas: Some(1),
                restart_policy: Some(String::from("Always")),
                service_account_name: Some(String::from(DEFAULT_SERVICE_ACCOUNT)),
                image_pull: Some(ImagePullOverride {
                    policy: Some(String::from("IfNotPresent")),
                    secret: None,
                }),
                autoscale: Some(AutoscaleOverride {
                    max_replicas: Some(0),
                    cpu_threshold: Some(DEFAULT_THRESHOLD),
                    mem_threshold: Some(DEFAULT_THRESHOLD),
                }),
                ..WorkloadOverride::default()
            }),
            service: Some(ServiceOverride {
                kind: Some(String::from("None")),
                ..ServiceOverride::default()
            }),
        }
    }
}
