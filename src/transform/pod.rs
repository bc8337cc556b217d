//! Pod template synthesis.
//!
//! Builds the single-container pod template of a service together with the
//! objects that only exist to back its mounts: PersistentVolumeClaims for
//! named and anonymous volumes and ConfigMaps for bind-mounted files.

use std::collections::BTreeMap;

use tracing::debug;

use crate::compose::Project;
use crate::config::ResolvedWorkload;
use crate::diagnostics::Diagnostics;
use crate::error::{ConfigError, Result, TransformError};
use crate::k8s::{
    ANNOTATION_CONFIG_HASH, Capabilities, ConfigMap, Container, ContainerPort, KeyToPath,
    LABEL_SERVICE, LabelSelector, LocalObjectReference, ObjectMeta, PersistentVolumeClaim,
    PodMeta, PodSecurityContext, PodSpec, PodTemplateSpec, ResourceRequirements,
    SecurityContext, Volume, VolumeMount, network_label, normalize_name,
};
use crate::project::ProjectService;
use crate::units::{format_cpu, format_memory, parse_duration_secs};
use crate::volumes::{VolumeBinding, VolumeSource};

use super::env::EnvExpander;
use super::files::{FileObjects, object_name};
use super::hash::ConfigHasher;
use super::placement::node_selector;
use super::TransformOptions;

/// Directory secrets are mounted under.
pub const SECRETS_DIR: &str = "/run/secrets";

/// A pod template and the objects backing its volumes.
#[derive(Debug, Clone)]
pub struct PodOutput {
    /// The pod template.
    pub template: PodTemplateSpec,
    /// Claims for persistent bindings.
    pub claims: Vec<PersistentVolumeClaim>,
    /// ConfigMaps holding bind-mounted files.
    pub config_maps: Vec<ConfigMap>,
}

/// Builder for one service's pod template.
pub struct PodBuilder<'a> {
    service: &'a ProjectService<'a>,
    project: &'a Project,
    files: &'a FileObjects,
    options: &'a TransformOptions,
    name: String,
    volumes: Vec<Volume>,
    mounts: Vec<VolumeMount>,
    claims: Vec<PersistentVolumeClaim>,
    config_maps: Vec<ConfigMap>,
    hasher: ConfigHasher,
}

impl<'a> PodBuilder<'a> {
    /// Creates a builder for `service`.
    #[must_use]
    pub fn new(
        service: &'a ProjectService<'a>,
        project: &'a Project,
        files: &'a FileObjects,
        options: &'a TransformOptions,
    ) -> Self {
        Self {
            service,
            project,
            files,
            options,
            name: normalize_name(service.name()),
            volumes: Vec::new(),
            mounts: Vec::new(),
            claims: Vec::new(),
            config_maps: Vec::new(),
            hasher: ConfigHasher::new(),
        }
    }

    /// Builds the pod template.
    ///
    /// # Errors
    ///
    /// Returns an error for an unusable name or image, invalid environment
    /// references, undeclared secrets or configs, unreadable bind-mounted
    /// files and malformed durations.
    pub fn build(
        mut self,
        bindings: &[VolumeBinding],
        diagnostics: &mut Diagnostics,
    ) -> Result<PodOutput> {
        let service = self.service;
        let service_name = service.name();
        if self.name.is_empty() {
            return Err(ConfigError::validation(
                service_name,
                "name",
                "service name has no characters valid in a Kubernetes name",
            )
            .into());
        }

        let compose = service.compose();
        let workload = &service.config().workload;

        let image = compose
            .image
            .clone()
            .filter(|image| !image.trim().is_empty())
            .unwrap_or_else(|| service_name.to_string());
        if image.trim().is_empty() {
            return Err(TransformError::MissingImage {
                service: service_name.to_string(),
            }
            .into());
        }

        for (index, binding) in bindings.iter().enumerate() {
            self.mount_binding(index, binding, diagnostics)?;
        }
        self.mount_secrets()?;
        self.mount_configs()?;

        let options = self.options;
        let env = EnvExpander::new(&options.environment).expand(
            service_name,
            &compose.environment,
            diagnostics,
        )?;

        let container = Container {
            name: self.name.clone(),
            image,
            image_pull_policy: Some(workload.image_pull_policy.to_string()),
            command: workload
                .command
                .clone()
                .or_else(|| compose.entrypoint.as_ref().map(|e| e.to_vec())),
            args: workload
                .command_args
                .clone()
                .or_else(|| compose.command.as_ref().map(|c| c.to_vec())),
            working_dir: compose.working_dir.clone(),
            env,
            ports: service
                .effective_ports()
                .iter()
                .map(|port| ContainerPort {
                    container_port: port.target,
                    protocol: port.protocol.as_k8s().to_string(),
                })
                .collect(),
            resources: self.resources(),
            liveness_probe: service.liveness_probe()?,
            readiness_probe: service.readiness_probe()?,
            volume_mounts: std::mem::take(&mut self.mounts),
            security_context: self.container_security(diagnostics),
        };

        let termination_grace_period_seconds = compose
            .stop_grace_period
            .as_deref()
            .map(|period| {
                parse_duration_secs(period).map_err(|_| TransformError::InvalidQuantity {
                    service: service_name.to_string(),
                    field: String::from("stop_grace_period"),
                    value: period.to_string(),
                })
            })
            .transpose()?;

        let constraints = compose
            .deploy
            .as_ref()
            .and_then(|d| d.placement.as_ref())
            .map(|p| p.constraints.as_slice())
            .unwrap_or_default();

        let spec = PodSpec {
            containers: vec![container],
            volumes: std::mem::take(&mut self.volumes),
            restart_policy: Some(workload.restart_policy.to_string()),
            service_account_name: Some(workload.service_account_name.clone())
                .filter(|account| account != crate::config::DEFAULT_SERVICE_ACCOUNT),
            security_context: pod_security(workload),
            image_pull_secrets: workload
                .image_pull_secret
                .iter()
                .map(|name| LocalObjectReference { name: name.clone() })
                .collect(),
            hostname: compose.hostname.clone(),
            subdomain: compose.domainname.clone(),
            termination_grace_period_seconds,
            node_selector: node_selector(service_name, constraints, diagnostics),
        };

        let mut labels = BTreeMap::new();
        labels.insert(LABEL_SERVICE.to_string(), self.name.clone());
        for network in compose.joined_networks() {
            labels.insert(network_label(&network), String::from("true"));
        }

        let mut annotations = BTreeMap::new();
        if let Some(checksum) = self.hasher.finish() {
            annotations.insert(ANNOTATION_CONFIG_HASH.to_string(), checksum);
        }

        debug!(
            service = service_name,
            volumes = spec.volumes.len(),
            claims = self.claims.len(),
            "Built pod template"
        );

        Ok(PodOutput {
            template: PodTemplateSpec {
                metadata: PodMeta {
                    labels,
                    annotations,
                },
                spec,
            },
            claims: self.claims,
            config_maps: self.config_maps,
        })
    }

    fn add_volume(&mut self, volume: Volume) {
        if !self.volumes.iter().any(|v| v.name == volume.name) {
            self.volumes.push(volume);
        }
    }

    fn mount_binding(
        &mut self,
        index: usize,
        binding: &VolumeBinding,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        match binding.source {
            VolumeSource::Named | VolumeSource::Anonymous => {
                self.add_volume(Volume::from_pvc(
                    binding.claim_name.as_str(),
                    binding.claim_name.as_str(),
                    binding.read_only,
                ));
                self.mounts.push(VolumeMount::new(
                    binding.claim_name.as_str(),
                    binding.mount_path.as_str(),
                    binding.read_only,
                ));
                let claim = self.claim(binding, diagnostics);
                self.claims.push(claim);
            }
            VolumeSource::Tmpfs => {
                self.add_volume(Volume::from_empty_dir(
                    binding.claim_name.as_str(),
                    Some(String::from("Memory")),
                ));
                self.mounts.push(VolumeMount::new(
                    binding.claim_name.as_str(),
                    binding.mount_path.as_str(),
                    binding.read_only,
                ));
            }
            VolumeSource::Bind => self.mount_bind(index, binding, diagnostics)?,
        }
        Ok(())
    }

    fn mount_bind(
        &mut self,
        index: usize,
        binding: &VolumeBinding,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let project = self.project;
        let path = project.working_dir.join(&binding.volume_name);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        if let (true, Some(key)) = (path.is_file(), file_name) {
            let content =
                std::fs::read(&path).map_err(|e| TransformError::file_read(path.clone(), &e))?;
            let cm_name = format!("{}-cm{index}", self.name);
            let config_map = ConfigMap::new(
                ObjectMeta::new(cm_name.as_str(), self.options.namespace.as_deref())
                    .with_label(LABEL_SERVICE, self.name.as_str()),
            )
            .with_content(key.as_str(), content);
            self.hasher.add_config_map(&cm_name, &config_map);
            self.config_maps.push(config_map);

            self.add_volume(Volume::from_config_map(
                cm_name.as_str(),
                cm_name.as_str(),
                vec![KeyToPath {
                    key: key.clone(),
                    path: key.clone(),
                }],
            ));
            self.mounts.push(VolumeMount::readonly_file(
                cm_name.as_str(),
                binding.mount_path.as_str(),
                key,
            ));
        } else {
            diagnostics.warn(
                Some(self.service.name()),
                format!(
                    "bind mount '{}' is not a local file; mapped to a hostPath volume",
                    binding.volume_name
                ),
            );
            self.add_volume(Volume::from_host_path(
                binding.claim_name.as_str(),
                binding.volume_name.as_str(),
            ));
            self.mounts.push(VolumeMount::new(
                binding.claim_name.as_str(),
                binding.mount_path.as_str(),
                binding.read_only,
            ));
        }
        Ok(())
    }

    fn claim(&self, binding: &VolumeBinding, diagnostics: &mut Diagnostics) -> PersistentVolumeClaim {
        let owner = binding.inherited_from.as_deref().unwrap_or(&binding.service);
        let meta = ObjectMeta::new(binding.claim_name.as_str(), self.options.namespace.as_deref())
            .with_label(LABEL_SERVICE, normalize_name(owner));
        let mut claim = PersistentVolumeClaim::new(meta, &binding.access_mode, &binding.size);
        claim.spec.storage_class_name.clone_from(&binding.storage_class);

        if let Some(selector) = &binding.selector {
            let mut match_labels = BTreeMap::new();
            for pair in selector.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some((k, v)) => {
                        match_labels.insert(k.trim().to_string(), v.trim().to_string());
                    }
                    None => diagnostics.warn(
                        Some(self.service.name()),
                        format!("volume selector entry '{pair}' is not key=value; ignored"),
                    ),
                }
            }
            if !match_labels.is_empty() {
                claim.spec.selector = Some(LabelSelector { match_labels });
            }
        }
        claim
    }

    fn mount_secrets(&mut self) -> Result<()> {
        let (service, project, files) = (self.service, self.project, self.files);
        let service_name = service.name();
        for reference in &service.compose().secrets {
            let source = reference.source();
            let declared = project.secrets.get(source).ok_or_else(|| {
                TransformError::UndeclaredSecret {
                    service: service_name.to_string(),
                    name: source.to_string(),
                }
            })?;
            let secret_name = object_name(source, declared);
            if let Some(secret) = files.secrets.get(source) {
                self.hasher.add("Secret", &secret_name, &secret.data);
            }

            let target = reference.target().unwrap_or(source);
            let mount_path = if target.starts_with('/') {
                target.to_string()
            } else {
                format!("{SECRETS_DIR}/{target}")
            };
            let volume_name = format!("secret-{}", normalize_name(source));
            self.add_volume(Volume::from_secret(
                volume_name.as_str(),
                secret_name,
                vec![KeyToPath {
                    key: source.to_string(),
                    path: source.to_string(),
                }],
            ));
            self.mounts
                .push(VolumeMount::readonly_file(volume_name, mount_path, source));
        }
        Ok(())
    }

    fn mount_configs(&mut self) -> Result<()> {
        let (service, project, files) = (self.service, self.project, self.files);
        let service_name = service.name();
        for reference in &service.compose().configs {
            let source = reference.source();
            let declared = project.configs.get(source).ok_or_else(|| {
                TransformError::UndeclaredConfig {
                    service: service_name.to_string(),
                    name: source.to_string(),
                }
            })?;
            let config_name = object_name(source, declared);
            if let Some(config_map) = files.configs.get(source) {
                self.hasher.add_config_map(&config_name, config_map);
            }

            let mount_path = match reference.target() {
                Some(target) if target.starts_with('/') => target.to_string(),
                Some(target) => format!("/{target}"),
                None => format!("/{source}"),
            };
            let volume_name = format!("config-{}", normalize_name(source));
            self.add_volume(Volume::from_config_map(
                volume_name.as_str(),
                config_name,
                vec![KeyToPath {
                    key: source.to_string(),
                    path: source.to_string(),
                }],
            ));
            self.mounts
                .push(VolumeMount::readonly_file(volume_name, mount_path, source));
        }
        Ok(())
    }

    fn resources(&self) -> Option<ResourceRequirements> {
        fn set(map: &mut BTreeMap<String, String>, key: &str, value: u64, format: fn(u64) -> String) {
            if value > 0 {
                map.insert(key.to_string(), format(value));
            }
        }

        let service = self.service;
        let mut resources = ResourceRequirements::default();
        set(&mut resources.requests, "cpu", service.cpu_request(), format_cpu);
        set(&mut resources.requests, "memory", service.memory_request(), format_memory);
        set(&mut resources.requests, "ephemeral-storage", service.storage_request(), format_memory);
        set(&mut resources.limits, "cpu", service.cpu_limit(), format_cpu);
        set(&mut resources.limits, "memory", service.memory_limit(), format_memory);
        set(&mut resources.limits, "ephemeral-storage", service.storage_limit(), format_memory);

        (!resources.is_empty()).then_some(resources)
    }

    fn container_security(&self, diagnostics: &mut Diagnostics) -> Option<SecurityContext> {
        let compose = self.service.compose();
        let mut context = SecurityContext {
            privileged: compose.privileged.then_some(true),
            read_only_root_filesystem: compose.read_only.then_some(true),
            ..SecurityContext::default()
        };
        if !compose.cap_add.is_empty() || !compose.cap_drop.is_empty() {
            context.capabilities = Some(Capabilities {
                add: compose.cap_add.clone(),
                drop: compose.cap_drop.clone(),
            });
        }

        if let Some(user) = &compose.user {
            let (uid, gid) = user
                .split_once(':')
                .map_or((user.as_str(), None), |(u, g)| (u, Some(g)));
            match uid.parse::<i64>() {
                Ok(uid) => context.run_as_user = Some(uid),
                Err(_) => diagnostics.warn(
                    Some(self.service.name()),
                    format!("user '{user}' is not numeric; runAsUser not set"),
                ),
            }
            if let Some(gid) = gid {
                match gid.parse::<i64>() {
                    Ok(gid) => context.run_as_group = Some(gid),
                    Err(_) => diagnostics.warn(
                        Some(self.service.name()),
                        format!("group '{gid}' is not numeric; runAsGroup not set"),
                    ),
                }
            }
        }

        (!context.is_empty()).then_some(context)
    }
}

fn pod_security(workload: &ResolvedWorkload) -> Option<PodSecurityContext> {
    let security = workload.pod_security;
    (!security.is_empty()).then_some(PodSecurityContext {
        run_as_user: security.run_as_user,
        run_as_group: security.run_as_group,
        fs_group: security.fs_group,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ComposeParser;
    use crate::config::{ConfigResolver, K8sOverride};
    use crate::volumes::VolumeResolver;

    fn build(project: &Project, name: &str) -> (Result<PodOutput>, Diagnostics) {
        let compose = project.service(name).unwrap();
        let config =
            ConfigResolver::resolve(name, compose, compose.k8s.as_ref(), &K8sOverride::default())
                .unwrap();
        let view = ProjectService::new(name, compose, config);
        let mut diagnostics = Diagnostics::new();
        let (files, failures) = FileObjects::build(project, None, &mut diagnostics);
        assert!(failures.is_empty());
        let bindings = VolumeResolver::new(project)
            .resolve(name, &mut diagnostics)
            .unwrap();
        let options = TransformOptions::default();
        let output = PodBuilder::new(&view, project, &files, &options).build(&bindings, &mut diagnostics);
        (output, diagnostics)
    }

    fn parse(yaml: &str) -> Project {
        ComposeParser::new().parse_yaml(yaml, None).unwrap()
    }

    #[test]
    fn test_container_basics() {
        let project = parse(
            r#"
services:
  web:
    image: nginx:1.25
    entrypoint: ["/docker-entrypoint.sh"]
    command: nginx -g "daemon off;"
    working_dir: /srv
    ports: ["8080:80"]
    user: "1000:2000"
    cap_add: [NET_ADMIN]
    stop_grace_period: 1m
    networks: [front]
"#,
        );
        let (output, _) = build(&project, "web");
        let output = output.unwrap();
        let spec = &output.template.spec;
        let container = &spec.containers[0];

        assert_eq!(container.name, "web");
        assert_eq!(container.image, "nginx:1.25");
        assert_eq!(container.command.as_deref(), Some(&[String::from("/docker-entrypoint.sh")][..]));
        assert_eq!(container.args.as_ref().unwrap()[0], "nginx");
        assert_eq!(container.ports[0].container_port, 80);
        assert_eq!(container.ports[0].protocol, "TCP");
        let security = container.security_context.as_ref().unwrap();
        assert_eq!(security.run_as_user, Some(1000));
        assert_eq!(security.run_as_group, Some(2000));
        assert_eq!(spec.termination_grace_period_seconds, Some(60));
        assert_eq!(spec.restart_policy.as_deref(), Some("Always"));
        assert!(spec.service_account_name.is_none());

        let labels = &output.template.metadata.labels;
        assert_eq!(labels.get(LABEL_SERVICE).map(String::as_str), Some("web"));
        assert_eq!(labels.get(&network_label("front")).map(String::as_str), Some("true"));
    }

    #[test]
    fn test_image_defaults_to_service_name() {
        let project = parse("services:\n  redis: {}\n");
        let (output, _) = build(&project, "redis");
        assert_eq!(output.unwrap().template.spec.containers[0].image, "redis");
    }

    #[test]
    fn test_override_command_wins() {
        let project = parse(
            "services:\n  app:\n    image: app\n    command: [serve]\n    x-k8s:\n      workload:\n        commandArgs: [worker]\n",
        );
        let (output, _) = build(&project, "app");
        assert_eq!(
            output.unwrap().template.spec.containers[0].args,
            Some(vec![String::from("worker")])
        );
    }

    #[test]
    fn test_persistent_and_tmpfs_volumes() {
        let project = parse(
            r#"
services:
  db:
    image: postgres
    volumes:
      - data:/var/lib/postgresql/data
      - type: tmpfs
        target: /tmp
volumes:
  data:
    x-k8s:
      size: 1Gi
      selector: "tier=db, bad"
"#,
        );
        let (output, diagnostics) = build(&project, "db");
        let output = output.unwrap();
        assert_eq!(output.claims.len(), 1);
        let claim = &output.claims[0];
        assert_eq!(claim.metadata.name, "db-claim0");
        assert_eq!(
            claim.spec.resources.requests.get("storage").map(String::as_str),
            Some("1Gi")
        );
        assert_eq!(
            claim.spec.selector.as_ref().unwrap().match_labels.get("tier").map(String::as_str),
            Some("db")
        );
        assert_eq!(diagnostics.warnings().count(), 1);

        let volumes = &output.template.spec.volumes;
        assert_eq!(volumes.len(), 2);
        assert_eq!(
            volumes[0].persistent_volume_claim.as_ref().unwrap().claim_name,
            "db-claim0"
        );
        assert_eq!(
            volumes[1].empty_dir.as_ref().unwrap().medium.as_deref(),
            Some("Memory")
        );
    }

    #[test]
    fn test_bind_mounts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nginx.conf"), "events {}\n").unwrap();
        let project = ComposeParser::new()
            .with_base_path(dir.path())
            .parse_yaml(
                "services:\n  web:\n    image: nginx\n    volumes:\n      - ./nginx.conf:/etc/nginx/nginx.conf:ro\n      - /var/log:/logs\n",
                None,
            )
            .unwrap();
        let (output, diagnostics) = build(&project, "web");
        let output = output.unwrap();

        assert_eq!(output.config_maps.len(), 1);
        assert_eq!(output.config_maps[0].metadata.name, "web-cm0");
        let mounts = &output.template.spec.containers[0].volume_mounts;
        assert_eq!(mounts[0].sub_path.as_deref(), Some("nginx.conf"));
        assert_eq!(
            output.template.spec.volumes[1].host_path.as_ref().unwrap().path,
            "/var/log"
        );
        assert_eq!(diagnostics.warnings().count(), 1);
        assert!(output
            .template
            .metadata
            .annotations
            .contains_key(ANNOTATION_CONFIG_HASH));
    }

    #[test]
    fn test_binary_bind_mount_uses_binary_data() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keystore.p12"), [0x30u8, 0x82, 0xff, 0xfe]).unwrap();
        let project = ComposeParser::new()
            .with_base_path(dir.path())
            .parse_yaml(
                "services:\n  app:\n    image: app\n    volumes:\n      - ./keystore.p12:/etc/ssl/keystore.p12:ro\n",
                None,
            )
            .unwrap();
        let (output, _) = build(&project, "app");
        let config_map = &output.unwrap().config_maps[0];

        assert!(config_map.data.is_empty());
        assert_eq!(
            config_map.binary_data.get("keystore.p12").map(String::as_str),
            Some("MIL//g==")
        );
    }

    #[test]
    fn test_secret_and_config_mounts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pw.txt"), "s3cret").unwrap();
        let project = ComposeParser::new()
            .with_base_path(dir.path())
            .parse_yaml(
                r#"
services:
  app:
    image: app
    secrets:
      - db_password
      - source: db_password
        target: custom
    configs:
      - source: app_conf
        target: /etc/app.conf
secrets:
  db_password:
    file: ./pw.txt
configs:
  app_conf:
    content: "a=1"
"#,
                None,
            )
            .unwrap();
        let (output, _) = build(&project, "app");
        let output = output.unwrap();
        let mounts = &output.template.spec.containers[0].volume_mounts;
        let paths: Vec<&str> = mounts.iter().map(|m| m.mount_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["/run/secrets/db_password", "/run/secrets/custom", "/etc/app.conf"]
        );
        assert_eq!(output.template.spec.volumes.len(), 2);
        assert_eq!(
            output.template.spec.volumes[0].secret.as_ref().unwrap().secret_name,
            "db-password"
        );
        assert!(output
            .template
            .metadata
            .annotations
            .contains_key(ANNOTATION_CONFIG_HASH));
    }

    #[test]
    fn test_undeclared_secret_is_error() {
        let project = parse("services:\n  app:\n    image: app\n    secrets: [ghost]\n");
        let (output, _) = build(&project, "app");
        assert!(matches!(
            output,
            Err(crate::error::KubeComposeError::Transform(
                TransformError::UndeclaredSecret { .. }
            ))
        ));
    }

    #[test]
    fn test_non_numeric_user_warns() {
        let project = parse("services:\n  app:\n    image: app\n    user: nobody\n");
        let (output, diagnostics) = build(&project, "app");
        assert!(output.unwrap().template.spec.containers[0].security_context.is_none());
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn test_resources_from_reservations() {
        let project = parse(
            r#"
services:
  app:
    image: app
    deploy:
      resources:
        reservations:
          cpus: "0.25"
          memory: 64Mi
x-k8s: {}
"#,
        );
        let (output, _) = build(&project, "app");
        let output = output.unwrap();
        let resources = output.template.spec.containers[0].resources.clone().unwrap();
        assert_eq!(resources.requests.get("cpu").map(String::as_str), Some("250m"));
        assert_eq!(resources.requests.get("memory").map(String::as_str), Some("67108864"));
        assert!(resources.limits.is_empty());
    }
}
