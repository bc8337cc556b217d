//! Compose project model.
//!
//! This module holds the read-only input of a conversion run:
//! - The typed project and service model
//! - Serde helpers for the loose Compose syntaxes
//! - A loader for normalized project documents

pub(crate) mod de;
mod parser;
mod spec;

pub use de::StringOrList;
pub use parser::{ComposeParser, DEFAULT_COMPOSE_FILES, find_compose_file};
pub use spec::{
    DEFAULT_NETWORK, DeployConfig, Environment, ExposeConfig, FileObjectConfig, FileReference,
    HealthCheckConfig, Labels, LongVolumeMount, NetworkConfig, Networks, PlacementConfig,
    PortConfig, Project, Protocol, ResourceSpec, ResourcesConfig, RestartPolicyConfig,
    ServiceConfig, UpdateConfig, VolumeConfig, VolumeMountEntry,
};
