//! Object synthesis.
//!
//! This module turns a Compose project into Kubernetes objects:
//! - Secrets and ConfigMaps from top-level declarations
//! - One pod template and workload per service
//! - Services, Ingresses and NetworkPolicies
//! - Autoscalers, ServiceAccounts and PersistentVolumeClaims
//!
//! Services are processed in name order and independently: a failing
//! service is reported in [`TransformOutput::failures`] and contributes no
//! objects, while every other service is still converted.

mod autoscale;
mod env;
mod files;
mod hash;
mod network;
mod placement;
mod pod;
mod postprocess;
mod workload;

pub use autoscale::build_autoscaler;
pub use env::{CONTAINER_RESOURCE_PATHS, EnvExpander, POD_FIELD_PATHS};
pub use files::{FileObjects, object_name};
pub use hash::ConfigHasher;
pub use network::{
    HEADLESS_PORT, HEADLESS_PORT_NAME, build_ingress, build_network_policies, build_service,
};
pub use placement::node_selector;
pub use pod::{PodBuilder, PodOutput, SECRETS_DIR};
pub use postprocess::postprocess;
pub use workload::build_workload;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::compose::{Project, ServiceConfig};
use crate::config::{
    ConfigResolver, DEFAULT_SERVICE_ACCOUNT, K8sOverride, OverrideParser, ResolvedServiceConfig,
};
use crate::diagnostics::Diagnostics;
use crate::error::{ConfigError, Result, TransformError};
use crate::k8s::{KubernetesObject, ObjectMeta, ServiceAccount, normalize_name};
use crate::project::ProjectService;
use crate::volumes::VolumeResolver;

/// Options of a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Namespace set on every object; omitted when `None`.
    pub namespace: Option<String>,
    /// Invoking environment, used for variables declared without a value.
    pub environment: BTreeMap<String, String>,
}

/// Result of a conversion run.
#[derive(Debug, Default)]
pub struct TransformOutput {
    /// Deduplicated objects, Services first.
    pub objects: Vec<KubernetesObject>,
    /// Warnings collected during the run.
    pub diagnostics: Diagnostics,
    /// Failures; services listed here contributed no objects.
    pub failures: Vec<TransformError>,
}

impl TransformOutput {
    /// Returns true if no service failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolution outcome of one service, as reported by [`Transformer::resolve`].
#[derive(Debug)]
pub struct ServiceResolution {
    /// Service name.
    pub name: String,
    /// Resolved configuration or the reason it could not be resolved.
    pub config: std::result::Result<ResolvedServiceConfig, ConfigError>,
}

/// Converter from a Compose project to Kubernetes objects.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    options: TransformOptions,
}

impl Transformer {
    /// Creates a transformer.
    #[must_use]
    pub const fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    /// Returns the run options.
    #[must_use]
    pub const fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Resolves the configuration of every service without synthesizing
    /// objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the project-wide override is invalid.
    pub fn resolve(&self, project: &Project) -> Result<Vec<ServiceResolution>> {
        let project_override = OverrideParser::decode_project(project.k8s.as_ref())?;
        Ok(project
            .services
            .iter()
            .map(|(name, compose)| ServiceResolution {
                name: name.clone(),
                config: ConfigResolver::resolve(
                    name,
                    compose,
                    compose.k8s.as_ref(),
                    &project_override,
                ),
            })
            .collect())
    }

    /// Converts a project.
    ///
    /// Services named in `excluded` and services whose override sets
    /// `disabled` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the project-wide override is invalid;
    /// per-service problems are reported in [`TransformOutput::failures`].
    pub fn transform(&self, project: &Project, excluded: &[String]) -> Result<TransformOutput> {
        let project_override = OverrideParser::decode_project(project.k8s.as_ref())?;
        let namespace = self.options.namespace.as_deref();
        let mut output = TransformOutput::default();

        info!("Transforming {} services", project.services.len());

        let (files, file_failures) =
            FileObjects::build(project, namespace, &mut output.diagnostics);
        output.failures.extend(file_failures);

        let mut objects: Vec<KubernetesObject> = Vec::new();
        objects.extend(files.secrets.values().cloned().map(KubernetesObject::Secret));
        objects.extend(files.configs.values().cloned().map(KubernetesObject::ConfigMap));

        // Normalized object name to the service that claimed it first.
        let mut claimed: BTreeMap<String, &str> = BTreeMap::new();

        // BTreeMap iteration is the lexicographic processing order.
        for (name, compose) in &project.services {
            if excluded.iter().any(|e| e == name) {
                debug!(service = %name, "Service excluded");
                continue;
            }

            let object_name = normalize_name(name);
            if let Some(owner) = claimed.get(&object_name) {
                let e = ConfigError::validation(
                    name.as_str(),
                    "name",
                    format!("normalizes to '{object_name}', already used by service '{owner}'"),
                );
                output.diagnostics.error(Some(name.as_str()), e.to_string());
                output.failures.push(TransformError::service(name.as_str(), e));
                continue;
            }
            claimed.insert(object_name, name.as_str());

            let mut diagnostics = Diagnostics::new();
            match self.transform_service(
                name,
                compose,
                project,
                &project_override,
                &files,
                &mut diagnostics,
            ) {
                Ok(service_objects) => {
                    debug!(service = %name, objects = service_objects.len(), "Service transformed");
                    objects.extend(service_objects);
                }
                Err(e) => {
                    output.diagnostics.error(Some(name.as_str()), e.to_string());
                    output.failures.push(TransformError::service(name.as_str(), e));
                }
            }
            output.diagnostics.extend(diagnostics);
        }

        output.objects = postprocess(objects);
        info!(
            "Produced {} objects, {} failures",
            output.objects.len(),
            output.failures.len()
        );
        Ok(output)
    }

    fn transform_service(
        &self,
        name: &str,
        compose: &ServiceConfig,
        project: &Project,
        project_override: &K8sOverride,
        files: &FileObjects,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<KubernetesObject>> {
        let config = ConfigResolver::resolve(name, compose, compose.k8s.as_ref(), project_override)?;
        if config.disabled {
            info!(service = name, "Service disabled; skipped");
            return Ok(Vec::new());
        }

        let namespace = self.options.namespace.as_deref();
        let service = ProjectService::new(name, compose, config);
        let service_type = service.service_type()?;
        let kind = service.workload_type(diagnostics);
        let bindings = VolumeResolver::new(project).resolve(name, diagnostics)?;

        let pod = PodBuilder::new(&service, project, files, &self.options)
            .build(&bindings, diagnostics)?;
        let workload = build_workload(&service, kind, pod.template, namespace, diagnostics);

        let mut objects = Vec::new();

        if let Some(svc) = build_service(&service, service_type, namespace) {
            if let Some(exposure) = &service.config().service.expose {
                objects.extend(
                    build_ingress(&service, exposure, &svc, namespace).map(KubernetesObject::Ingress),
                );
            }
            objects.push(KubernetesObject::Service(svc));
        } else if service.config().service.expose.is_some() {
            diagnostics.warn(
                Some(name),
                "exposure configured but the service has no ports; no ingress emitted",
            );
        }

        if let Some(hpa) = build_autoscaler(&service, &workload, namespace) {
            objects.push(KubernetesObject::HorizontalPodAutoscaler(hpa));
        }
        objects.push(KubernetesObject::Workload(workload));

        objects.extend(
            build_network_policies(&service, project, namespace, diagnostics)
                .into_iter()
                .map(KubernetesObject::NetworkPolicy),
        );

        let account = &service.config().workload.service_account_name;
        if account != DEFAULT_SERVICE_ACCOUNT {
            objects.push(KubernetesObject::ServiceAccount(ServiceAccount::new(
                ObjectMeta::new(account.as_str(), namespace),
            )));
        }

        objects.extend(pod.claims.into_iter().map(KubernetesObject::PersistentVolumeClaim));
        objects.extend(pod.config_maps.into_iter().map(KubernetesObject::ConfigMap));
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ComposeParser;
    use crate::error::KubeComposeError;
    use crate::k8s::Workload;

    fn project(yaml: &str) -> Project {
        ComposeParser::new().parse_yaml(yaml, None).unwrap()
    }

    fn run(yaml: &str) -> TransformOutput {
        Transformer::default().transform(&project(yaml), &[]).unwrap()
    }

    fn kinds(output: &TransformOutput) -> Vec<(&'static str, String)> {
        output
            .objects
            .iter()
            .map(|o| (o.kind(), o.name().to_string()))
            .collect()
    }

    fn workload<'a>(output: &'a TransformOutput, name: &str) -> &'a Workload {
        output
            .objects
            .iter()
            .find_map(|o| match o {
                KubernetesObject::Workload(w) if w.metadata().name == name => Some(w),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_example_plain_service() {
        let output = run("services:\n  db:\n    image: postgres\n");
        assert!(output.is_success());
        assert_eq!(
            kinds(&output),
            vec![
                ("Deployment", String::from("db")),
                ("NetworkPolicy", String::from("default")),
            ]
        );
        match workload(&output, "db") {
            Workload::Deployment(d) => {
                assert_eq!(d.spec.replicas, 1);
                assert_eq!(d.spec.template.spec.restart_policy.as_deref(), Some("Always"));
            }
            other => panic!("unexpected workload: {}", other.kind()),
        }
    }

    #[test]
    fn test_example_node_port() {
        let output = run(
            r#"
services:
  web:
    image: nginx
    ports: ["8080:80"]
    x-k8s:
      service:
        type: NodePort
        nodeport: 30080
"#,
        );
        let KubernetesObject::Service(svc) = &output.objects[0] else {
            panic!("first object is not a Service");
        };
        assert_eq!(svc.spec.type_.as_deref(), Some("NodePort"));
        assert_eq!(svc.spec.ports.len(), 1);
        assert_eq!(svc.spec.ports[0].node_port, Some(30080));
        assert!(matches!(workload(&output, "web"), Workload::Deployment(_)));
    }

    #[test]
    fn test_example_ingress_domains() {
        let output = run(
            r#"
services:
  api:
    image: api
    ports: ["3000"]
    x-k8s:
      service:
        expose:
          domain: "a.com,b.com"
"#,
        );
        let ingress = output
            .objects
            .iter()
            .find_map(|o| match o {
                KubernetesObject::Ingress(i) => Some(i),
                _ => None,
            })
            .unwrap();
        let hosts: Vec<&str> = ingress.spec.rules.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["a.com", "b.com"]);
        assert!(ingress
            .spec
            .rules
            .iter()
            .all(|r| r.http.paths[0].backend.service.port.number == 3000));
    }

    #[test]
    fn test_example_secret_env_reference() {
        let output = run(
            "services:\n  app:\n    image: app\n    environment:\n      DSN: secret.db-creds.password\n",
        );
        let env = &workload(&output, "app").pod_template().spec.containers[0].env;
        assert_eq!(env[0].name, "DSN");
        assert!(env[0].value.is_none());
        let selector = env[0].value_from.as_ref().unwrap().secret_key_ref.as_ref().unwrap();
        assert_eq!(selector.name, "db-creds");
        assert_eq!(selector.key, "password");
    }

    #[test]
    fn test_example_shared_volume() {
        let output = run(
            r#"
services:
  store:
    image: store
    volumes: ["shared:/data"]
  reader:
    image: reader
    volumes_from: [store]
  writer:
    image: writer
    volumes_from: [store]
volumes:
  shared:
"#,
        );
        assert!(output.is_success());
        let claims: Vec<&str> = output
            .objects
            .iter()
            .filter(|o| o.kind() == "PersistentVolumeClaim")
            .map(KubernetesObject::name)
            .collect();
        assert_eq!(claims, vec!["store-claim0"]);

        for name in ["store", "reader", "writer"] {
            let volumes = &workload(&output, name).pod_template().spec.volumes;
            assert_eq!(
                volumes[0].persistent_volume_claim.as_ref().unwrap().claim_name,
                "store-claim0"
            );
        }
    }

    #[test]
    fn test_services_first_and_name_order() {
        let output = run(
            r#"
services:
  zeta:
    image: z
  alpha:
    image: a
    ports: ["80"]
  mid:
    image: m
    expose: ["9000"]
"#,
        );
        let objects = kinds(&output);
        let first_other = objects.iter().position(|(k, _)| *k != "Service").unwrap();
        assert!(objects[first_other..].iter().all(|(k, _)| *k != "Service"));
        assert_eq!(objects[0], ("Service", String::from("alpha")));
        assert_eq!(objects[1], ("Service", String::from("mid")));

        let workloads: Vec<&str> = objects
            .iter()
            .filter(|(k, _)| *k == "Deployment")
            .map(|(_, n)| n.as_str())
            .collect();
        assert_eq!(workloads, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_output_has_no_duplicate_keys() {
        let output = run(
            "services:\n  a:\n    image: a\n    networks: [back]\n  b:\n    image: b\n    networks: [back]\n",
        );
        let mut keys: Vec<_> = output.objects.iter().map(KubernetesObject::key).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(
            output.objects.iter().filter(|o| o.kind() == "NetworkPolicy").count(),
            1
        );
    }

    #[test]
    fn test_idempotent() {
        let yaml = "services:\n  web:\n    image: nginx\n    ports: [\"80\"]\n    environment:\n      B: \"2\"\n      A: \"{{B}}\"\n";
        let first = run(yaml);
        let second = run(yaml);
        assert_eq!(first.objects, second.objects);
        assert_eq!(
            serde_yaml::to_string(&first.objects).unwrap(),
            serde_yaml::to_string(&second.objects).unwrap()
        );
    }

    #[test]
    fn test_failure_isolated_to_service() {
        let output = run(
            r#"
services:
  broken:
    image: x
    x-k8s:
      workload:
        type: CronJob
  ok:
    image: y
"#,
        );
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].service_name(), Some("broken"));
        assert!(output.diagnostics.has_errors());
        let names: Vec<&str> = output.objects.iter().map(KubernetesObject::name).collect();
        assert!(names.contains(&"ok"));
        assert!(!names.contains(&"broken"));
    }

    #[test]
    fn test_colliding_normalized_names_reported() {
        let output = run("services:\n  my-db:\n    image: a\n  my_db:\n    image: b\n");
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].service_name(), Some("my_db"));
        assert!(output.failures[0].to_string().contains("already used by service 'my-db'"));
        let workloads: Vec<&str> = output
            .objects
            .iter()
            .filter(|o| o.kind() == "Deployment")
            .map(KubernetesObject::name)
            .collect();
        assert_eq!(workloads, vec!["my-db"]);
    }

    #[test]
    fn test_disabled_and_excluded_services_skipped() {
        let project = project(
            "services:\n  a:\n    image: a\n    x-k8s:\n      disabled: true\n  b:\n    image: b\n  c:\n    image: c\n",
        );
        let output = Transformer::default()
            .transform(&project, &[String::from("b")])
            .unwrap();
        let workloads: Vec<&str> = output
            .objects
            .iter()
            .filter(|o| o.kind() == "Deployment")
            .map(KubernetesObject::name)
            .collect();
        assert_eq!(workloads, vec!["c"]);
    }

    #[test]
    fn test_project_override_applies_and_service_wins() {
        let output = run(
            r#"
x-k8s:
  workload:
    replicas: 3
    imagePull:
      secret: regcred
services:
  a:
    image: a
  b:
    image: b
    x-k8s:
      workload:
        replicas: 1
"#,
        );
        match (workload(&output, "a"), workload(&output, "b")) {
            (Workload::Deployment(a), Workload::Deployment(b)) => {
                assert_eq!(a.spec.replicas, 3);
                assert_eq!(b.spec.replicas, 1);
                assert_eq!(b.spec.template.spec.image_pull_secrets[0].name, "regcred");
            }
            _ => panic!("expected deployments"),
        }
    }

    #[test]
    fn test_invalid_project_override_aborts_run() {
        let result = Transformer::default().transform(
            &project("x-k8s:\n  disabled: true\nservices:\n  a:\n    image: a\n"),
            &[],
        );
        assert!(matches!(result, Err(KubeComposeError::Config(_))));
    }

    #[test]
    fn test_namespace_and_service_account() {
        let options = TransformOptions {
            namespace: Some(String::from("prod")),
            ..TransformOptions::default()
        };
        let output = Transformer::new(options)
            .transform(
                &project(
                    "services:\n  a:\n    image: a\n    x-k8s:\n      workload:\n        serviceAccountName: runner\n",
                ),
                &[],
            )
            .unwrap();
        assert!(output.objects.iter().all(|o| o.namespace() == "prod"));
        assert!(output
            .objects
            .iter()
            .any(|o| o.kind() == "ServiceAccount" && o.name() == "runner"));
        assert_eq!(
            workload(&output, "a").pod_template().spec.service_account_name.as_deref(),
            Some("runner")
        );
    }

    #[test]
    fn test_resolve_reports_each_service() {
        let project = project(
            "services:\n  a:\n    image: a\n  b:\n    x-k8s:\n      service:\n        type: Bogus\n",
        );
        let resolutions = Transformer::default().resolve(&project).unwrap();
        assert_eq!(resolutions.len(), 2);
        assert!(resolutions[0].config.is_ok());
        assert!(resolutions[1].config.is_err());
    }
}
