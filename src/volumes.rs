//! Volume binding resolution.
//!
//! Every mount of a service becomes a [`VolumeBinding`]. Services listed in
//! `volumes_from` are resolved first; an own mount at the same container
//! path as a dependency mount reuses the dependency's claim, so services
//! sharing data end up on one PersistentVolumeClaim.

use std::fmt;

use tracing::debug;

use crate::compose::{Project, ServiceConfig, VolumeConfig, VolumeMountEntry};
use crate::config::OverrideParser;
use crate::diagnostics::Diagnostics;
use crate::error::VolumeError;
use crate::k8s::normalize_name;

/// Claim size used when the volume declares none.
pub const DEFAULT_VOLUME_SIZE: &str = "100Mi";
/// Access mode of every claim.
pub const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";

/// Storage class label on a top-level volume.
pub const LABEL_STORAGE_CLASS: &str = "kubecompose.volume.storage-class";
/// Size label on a top-level volume.
pub const LABEL_SIZE: &str = "kubecompose.volume.size";
/// Selector label on a top-level volume.
pub const LABEL_SELECTOR: &str = "kubecompose.volume.selector";

/// Where a mount's data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeSource {
    /// Top-level named volume.
    Named,
    /// Unnamed volume.
    Anonymous,
    /// Host path.
    Bind,
    /// In-memory filesystem.
    Tmpfs,
}

impl VolumeSource {
    /// Returns true for sources backed by a PersistentVolumeClaim.
    #[must_use]
    pub const fn is_persistent(self) -> bool {
        matches!(self, Self::Named | Self::Anonymous)
    }
}

impl fmt::Display for VolumeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Named => "named",
            Self::Anonymous => "anonymous",
            Self::Bind => "bind",
            Self::Tmpfs => "tmpfs",
        };
        f.write_str(s)
    }
}

/// One resolved mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBinding {
    /// Service the mount belongs to.
    pub service: String,
    /// Container path.
    pub mount_path: String,
    /// Named volume or host path; empty for anonymous and tmpfs mounts.
    pub volume_name: String,
    /// Claim (and pod volume) name.
    pub claim_name: String,
    /// Source kind.
    pub source: VolumeSource,
    /// Mounted read-only.
    pub read_only: bool,
    /// Claim access mode.
    pub access_mode: String,
    /// Claim size.
    pub size: String,
    /// Storage class.
    pub storage_class: Option<String>,
    /// Volume selector, `key=value[,key=value]`.
    pub selector: Option<String>,
    /// Service this binding was inherited from.
    pub inherited_from: Option<String>,
}

/// Resolver for the volume bindings of services.
#[derive(Debug, Clone, Copy)]
pub struct VolumeResolver<'a> {
    project: &'a Project,
}

impl<'a> VolumeResolver<'a> {
    /// Creates a resolver over a project.
    #[must_use]
    pub const fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// Resolves the bindings of one service, following `volumes_from`.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed mounts, unknown dependencies and
    /// inheritance cycles.
    pub fn resolve(
        &self,
        service_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<VolumeBinding>, VolumeError> {
        let mut visiting = Vec::new();
        self.resolve_service(service_name, service_name, &mut visiting, diagnostics)
    }

    fn resolve_service(
        &self,
        requested_by: &str,
        name: &str,
        visiting: &mut Vec<String>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<VolumeBinding>, VolumeError> {
        if let Some(start) = visiting.iter().position(|v| v == name) {
            let mut cycle = visiting[start..].to_vec();
            cycle.push(name.to_string());
            return Err(VolumeError::CircularInheritance {
                cycle: cycle.join(" -> "),
            });
        }
        let service = self
            .project
            .service(name)
            .ok_or_else(|| VolumeError::UnknownService {
                service: requested_by.to_string(),
                dependency: name.to_string(),
            })?;

        visiting.push(name.to_string());
        let mut bindings = self.own_bindings(name, service)?;

        let mut inherited = Vec::new();
        for entry in &service.volumes_from {
            if entry.starts_with("container:") {
                diagnostics.warn(
                    Some(name),
                    format!("volumes_from '{entry}' references a container and is not supported"),
                );
                continue;
            }
            let (dependency, mode) = entry.split_once(':').unwrap_or((entry.as_str(), "rw"));
            let mut dependency_bindings =
                self.resolve_service(name, dependency, visiting, diagnostics)?;
            for binding in &mut dependency_bindings {
                binding.read_only |= mode == "ro";
            }
            inherited.extend(dependency_bindings);
        }

        for binding in &mut bindings {
            if let Some(shared) = inherited.iter().find(|d| d.mount_path == binding.mount_path) {
                debug!(
                    service = name,
                    mount = %binding.mount_path,
                    from = %shared.service,
                    "Sharing inherited volume"
                );
                binding.volume_name.clone_from(&shared.volume_name);
                binding.claim_name.clone_from(&shared.claim_name);
                binding.source = shared.source;
                binding.size.clone_from(&shared.size);
                binding.storage_class.clone_from(&shared.storage_class);
                binding.selector.clone_from(&shared.selector);
                binding.inherited_from = Some(origin(shared));
            }
        }

        for dependency in inherited {
            if !bindings.iter().any(|b| b.claim_name == dependency.claim_name) {
                bindings.push(VolumeBinding {
                    service: name.to_string(),
                    inherited_from: Some(origin(&dependency)),
                    ..dependency
                });
            }
        }

        visiting.pop();
        Ok(bindings)
    }

    fn own_bindings(
        &self,
        name: &str,
        service: &ServiceConfig,
    ) -> Result<Vec<VolumeBinding>, VolumeError> {
        let prefix = normalize_name(name);
        service
            .volumes
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let mount = parse_mount(name, entry)?;
                let mut binding = VolumeBinding {
                    service: name.to_string(),
                    mount_path: mount.target,
                    volume_name: mount.source,
                    claim_name: format!("{prefix}-claim{index}"),
                    source: mount.kind,
                    read_only: mount.read_only,
                    access_mode: DEFAULT_ACCESS_MODE.to_string(),
                    size: DEFAULT_VOLUME_SIZE.to_string(),
                    storage_class: None,
                    selector: None,
                    inherited_from: None,
                };
                if binding.source == VolumeSource::Named
                    && let Some(volume) = self.project.volumes.get(&binding.volume_name)
                {
                    apply_storage(&mut binding, volume)?;
                }
                Ok(binding)
            })
            .collect()
    }
}

/// Service that originally declared a binding.
fn origin(binding: &VolumeBinding) -> String {
    binding
        .inherited_from
        .clone()
        .unwrap_or_else(|| binding.service.clone())
}

/// Fills storage settings from a named volume; the override beats labels.
fn apply_storage(binding: &mut VolumeBinding, volume: &VolumeConfig) -> Result<(), VolumeError> {
    let storage = OverrideParser::decode_volume(volume.k8s.as_ref()).map_err(|message| {
        VolumeError::InvalidOverride {
            volume: binding.volume_name.clone(),
            message,
        }
    })?;
    let label = |key: &str| volume.labels.get(key).map(str::to_string);

    binding.storage_class = storage.storage_class.or_else(|| label(LABEL_STORAGE_CLASS));
    binding.selector = storage.selector.or_else(|| label(LABEL_SELECTOR));
    if let Some(size) = storage.size.or_else(|| label(LABEL_SIZE)) {
        binding.size = size;
    }
    Ok(())
}

struct ParsedMount {
    kind: VolumeSource,
    source: String,
    target: String,
    read_only: bool,
}

fn parse_mount(service: &str, entry: &VolumeMountEntry) -> Result<ParsedMount, VolumeError> {
    let invalid = |reason: &str| VolumeError::InvalidMount {
        service: service.to_string(),
        spec: entry.to_string(),
        reason: reason.to_string(),
    };

    let mount = match entry {
        VolumeMountEntry::Short(spec) => {
            let mut parts: Vec<&str> = spec.split(':').collect();
            let mut read_only = false;
            if parts.len() > 1 && parts.last().is_some_and(|m| is_mode(m)) {
                read_only = parts.pop().is_some_and(|m| m.split(',').any(|o| o == "ro"));
            }
            match parts.as_slice() {
                [target] => ParsedMount {
                    kind: VolumeSource::Anonymous,
                    source: String::new(),
                    target: (*target).to_string(),
                    read_only,
                },
                [source, target] => ParsedMount {
                    kind: if is_host_path(source) {
                        VolumeSource::Bind
                    } else {
                        VolumeSource::Named
                    },
                    source: (*source).to_string(),
                    target: (*target).to_string(),
                    read_only,
                },
                _ => return Err(invalid("expected [source:]target[:mode]")),
            }
        }
        VolumeMountEntry::Long(long) => {
            let target = long
                .target
                .clone()
                .ok_or_else(|| invalid("long syntax requires 'target'"))?;
            let source = long.source.clone().unwrap_or_default();
            let kind = match long.kind.as_deref().unwrap_or("volume") {
                "volume" if source.is_empty() => VolumeSource::Anonymous,
                "volume" => VolumeSource::Named,
                "bind" if source.is_empty() => return Err(invalid("bind mount requires 'source'")),
                "bind" => VolumeSource::Bind,
                "tmpfs" => VolumeSource::Tmpfs,
                _ => return Err(invalid("type must be volume, bind or tmpfs")),
            };
            ParsedMount {
                kind,
                source,
                target,
                read_only: long.read_only,
            }
        }
    };

    if !mount.target.starts_with('/') {
        return Err(invalid("container path must be absolute"));
    }
    Ok(mount)
}

fn is_mode(part: &str) -> bool {
    part.split(',')
        .all(|option| matches!(option, "ro" | "rw" | "z" | "Z" | "cached" | "delegated" | "consistent" | "nocopy"))
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('/') || source.starts_with('.') || source.starts_with('~')
}
