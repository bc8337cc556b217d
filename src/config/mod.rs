//! Per-service deployment configuration.
//!
//! This module handles everything between the raw `x-k8s` documents and the
//! canonical configuration the synthesizer consumes:
//! - Decoding override documents into typed structs
//! - Inferring values from the Compose service definition
//! - Deep-merging candidates in precedence order
//! - Validating the result into a [`ResolvedServiceConfig`]

mod infer;
mod merge;
mod parser;
mod resolved;
mod resolver;
mod spec;
mod validator;

pub use infer::infer_override;
pub use merge::Merge;
pub use parser::{OverrideParser, PROJECT_SCOPE};
pub use resolved::{
    AutoscaleConfig, ExposureConfig, ImagePullPolicy, PodSecurityConfig, ProbeAction,
    ProbeConfig, ResolvedService, ResolvedServiceConfig, ResolvedWorkload, ResourceConfig,
    RestartPolicy, RollingUpdateConfig, ServiceType, WorkloadKind,
};
pub use resolver::ConfigResolver;
pub use spec::{
    AutoscaleOverride, ExecProbeOverride, ExposeOverride, HttpProbeOverride, ImagePullOverride,
    K8sOverride, PodSecurityOverride, ProbeOverride, ResourcesOverride, RollingUpdateOverride,
    ServiceOverride, TcpProbeOverride, VolumeOverride, WorkloadOverride,
};
pub use validator::{
    ConfigValidator, DEFAULT_SERVICE_ACCOUNT, DEFAULT_THRESHOLD, is_dns_label, is_dns_subdomain,
};
