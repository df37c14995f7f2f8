//! # IDE Server Provisioner
//!
//! Manages the five objects behind one VS Code server:
//!
//! - `<name>-vscode-workspace` claim
//! - `<name>-vscode-password` secret, holding `spec.ide.passwordSecret` verbatim
//! - `<name>-vscode-server` deployment mounting the workspace and the tooling script
//! - `<name>-vscode-server` ClusterIP service
//! - `<name>-vscode-ingress` TLS ingress on `<name>.<suffix>`
//!
//! The post-start hook that runs the tooling script and installs extensions is
//! only attached when the extension list is non-empty. Environments without
//! extensions never run the script.

use super::apply::{ensure, ObjectSpec};
use super::common::{
    app_labels, copy_claim_requests, copy_deployment_spec, copy_ingress_spec, copy_secret_data,
    copy_service_spec, volume_claim,
};
use super::naming;
use super::types::EnvironmentScope;
use crate::constants::{
    IDE_IMAGE, IDE_PASSWORD_KEY, IDE_PORT, IDE_TOOLS_MOUNT, IDE_WORKSPACE_MOUNT, INGRESS_CLASS,
    INSTALL_SCRIPT_KEY, ISSUER_NAME,
};
use crate::crd::DeveloperEnvironmentSpec;
use crate::store::ClusterStore;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource, ExecAction, Lifecycle,
    LifecycleHandler, PersistentVolumeClaim, PersistentVolumeClaimVolumeSource, PodSpec,
    PodTemplateSpec, ResourceRequirements, Secret, SecretKeySelector, Service, ServicePort,
    ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

const APP: &str = "vscode-server";
const WORKSPACE_VOLUME: &str = "workspace";
const TOOLS_VOLUME: &str = "tools-script";
const EXTENSIONS_DIR: &str = "/config/extensions";

fn meta(scope: &EnvironmentScope, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(scope.namespace.clone()),
        labels: Some(app_labels(APP, &scope.name)),
        ..Default::default()
    }
}

#[must_use]
pub fn desired_workspace_claim(scope: &EnvironmentScope) -> PersistentVolumeClaim {
    volume_claim(
        naming::ide_workspace_name(&scope.name),
        &scope.namespace,
        app_labels(APP, &scope.name),
    )
}

#[must_use]
pub fn desired_password_secret(scope: &EnvironmentScope, spec: &DeveloperEnvironmentSpec) -> Secret {
    Secret {
        metadata: meta(scope, naming::ide_password_name(&scope.name)),
        data: Some(BTreeMap::from([(
            IDE_PASSWORD_KEY.to_string(),
            ByteString(spec.ide.password_secret.clone().into_bytes()),
        )])),
        ..Default::default()
    }
}

/// Shell command run by the post-start hook, `None` without extensions
#[must_use]
pub fn post_start_command(extensions: &[String]) -> Option<String> {
    if extensions.is_empty() {
        return None;
    }
    Some(format!(
        ".{IDE_TOOLS_MOUNT}/{INSTALL_SCRIPT_KEY} && ./app/code-server/bin/code-server --extensions-dir {EXTENSIONS_DIR} --install-extension {}",
        extensions.join(" --install-extension ")
    ))
}

fn password_env(name: &str, secret: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: IDE_PASSWORD_KEY.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn plain_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}

#[must_use]
pub fn desired_deployment(scope: &EnvironmentScope, spec: &DeveloperEnvironmentSpec) -> Deployment {
    let selector = app_labels(APP, &scope.name);
    let mut labels = selector.clone();
    labels.insert("developer-env-uid".to_string(), scope.uid.clone());
    let password_secret = naming::ide_password_name(&scope.name);

    let lifecycle = post_start_command(&spec.ide.extensions).map(|command| Lifecycle {
        post_start: Some(LifecycleHandler {
            exec: Some(ExecAction {
                command: Some(vec!["/bin/bash".to_string(), "-c".to_string(), command]),
            }),
            ..Default::default()
        }),
        ..Default::default()
    });

    let container = Container {
        name: APP.to_string(),
        image: Some(IDE_IMAGE.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        ports: Some(vec![ContainerPort {
            name: Some("http".to_string()),
            container_port: IDE_PORT,
            ..Default::default()
        }]),
        env: Some(vec![
            plain_env("PUID", "1000"),
            plain_env("PGID", "1000"),
            password_env("PASSWORD", &password_secret),
            password_env("SUDO_PASSWORD", &password_secret),
        ]),
        lifecycle,
        volume_mounts: Some(vec![
            VolumeMount {
                name: WORKSPACE_VOLUME.to_string(),
                mount_path: IDE_WORKSPACE_MOUNT.to_string(),
                ..Default::default()
            },
            VolumeMount {
                name: TOOLS_VOLUME.to_string(),
                mount_path: IDE_TOOLS_MOUNT.to_string(),
                ..Default::default()
            },
        ]),
        resources: Some(ResourceRequirements {
            requests: Some(quantities("500m", "512Mi")),
            limits: Some(quantities("1", "1Gi")),
            ..Default::default()
        }),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            labels: Some(labels),
            ..meta(scope, naming::ide_server_name(&scope.name))
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(vec![
                        Volume {
                            name: WORKSPACE_VOLUME.to_string(),
                            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                                claim_name: naming::ide_workspace_name(&scope.name),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                        Volume {
                            name: TOOLS_VOLUME.to_string(),
                            config_map: Some(ConfigMapVolumeSource {
                                name: naming::tools_config_map_name(&scope.name),
                                default_mode: Some(0o777),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                    ]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[must_use]
pub fn desired_service(scope: &EnvironmentScope) -> Service {
    Service {
        metadata: meta(scope, naming::ide_server_name(&scope.name)),
        spec: Some(ServiceSpec {
            selector: Some(app_labels(APP, &scope.name)),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port: IDE_PORT,
                target_port: Some(IntOrString::Int(IDE_PORT)),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[must_use]
pub fn desired_ingress(scope: &EnvironmentScope) -> Ingress {
    let host = scope.host();
    let mut ingress_meta = meta(scope, naming::ide_ingress_name(&scope.name));
    ingress_meta.annotations = Some(BTreeMap::from([
        ("cert-manager.io/issuer".to_string(), ISSUER_NAME.to_string()),
        (
            "kubernetes.io/ingress.class".to_string(),
            INGRESS_CLASS.to_string(),
        ),
        (
            "nginx.ingress.kubernetes.io/force-ssl-redirect".to_string(),
            "true".to_string(),
        ),
    ]));

    Ingress {
        metadata: ingress_meta,
        spec: Some(IngressSpec {
            ingress_class_name: Some(INGRESS_CLASS.to_string()),
            rules: Some(vec![IngressRule {
                host: Some(host.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: naming::ide_server_name(&scope.name),
                                port: Some(ServiceBackendPort {
                                    number: Some(IDE_PORT),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![host.clone()]),
                secret_name: Some(host),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub async fn ensure_ide(
    store: &dyn ClusterStore,
    scope: &EnvironmentScope,
    spec: &DeveloperEnvironmentSpec,
) -> anyhow::Result<()> {
    ensure(
        store,
        ObjectSpec::overwrite(desired_workspace_claim(scope), copy_claim_requests),
    )
    .await?;
    ensure(
        store,
        ObjectSpec::overwrite(desired_password_secret(scope, spec), copy_secret_data),
    )
    .await?;
    ensure(
        store,
        ObjectSpec::overwrite(desired_deployment(scope, spec), copy_deployment_spec),
    )
    .await?;
    ensure(
        store,
        ObjectSpec::overwrite(desired_service(scope), copy_service_spec),
    )
    .await?;
    ensure(
        store,
        ObjectSpec::overwrite(desired_ingress(scope), copy_ingress_spec),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::IdeConfig;

    fn scope() -> EnvironmentScope {
        EnvironmentScope {
            name: "alice".to_string(),
            namespace: "team".to_string(),
            uid: "uid-1".to_string(),
            domain_suffix: "example.test".to_string(),
        }
    }

    fn spec(extensions: &[&str]) -> DeveloperEnvironmentSpec {
        DeveloperEnvironmentSpec {
            language: "go".to_string(),
            version: String::new(),
            ide: IdeConfig {
                extensions: extensions.iter().map(|e| (*e).to_string()).collect(),
                password_secret: "hunter2".to_string(),
                ..Default::default()
            },
            database: Default::default(),
            dependencies: Vec::new(),
        }
    }

    fn container(deployment: &Deployment) -> &Container {
        &deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0]
    }

    #[test]
    fn test_post_start_command_installs_extensions_in_order() {
        let command = post_start_command(&["b.two".to_string(), "a.one".to_string()]).unwrap();
        assert_eq!(
            command,
            "./config/tools/install-tools.sh && ./app/code-server/bin/code-server --extensions-dir /config/extensions --install-extension b.two --install-extension a.one"
        );
        assert!(post_start_command(&[]).is_none());
    }

    #[test]
    fn test_hook_only_with_extensions() {
        let without = desired_deployment(&scope(), &spec(&[]));
        assert!(container(&without).lifecycle.is_none());

        let with = desired_deployment(&scope(), &spec(&["ms-python.python"]));
        let hook = container(&with)
            .lifecycle
            .as_ref()
            .and_then(|l| l.post_start.as_ref())
            .and_then(|h| h.exec.as_ref())
            .and_then(|e| e.command.clone())
            .unwrap();
        assert_eq!(hook[0], "/bin/bash");
        assert_eq!(hook[1], "-c");
        assert!(hook[2].ends_with("--install-extension ms-python.python"));
    }

    #[test]
    fn test_tools_volume_is_executable() {
        let deployment = desired_deployment(&scope(), &spec(&[]));
        let volumes = deployment.spec.unwrap().template.spec.unwrap().volumes.unwrap();
        let tools = volumes.iter().find(|v| v.name == TOOLS_VOLUME).unwrap();
        let source = tools.config_map.as_ref().unwrap();
        assert_eq!(source.name, "alice-dev-tools-scripts");
        assert_eq!(source.default_mode, Some(0o777));
    }

    #[test]
    fn test_password_is_copied_verbatim() {
        let secret = desired_password_secret(&scope(), &spec(&[]));
        assert_eq!(
            secret.data.unwrap()[IDE_PASSWORD_KEY],
            ByteString(b"hunter2".to_vec())
        );
    }

    #[test]
    fn test_ingress_routes_host_to_service() {
        let ingress = desired_ingress(&scope());
        let spec = ingress.spec.unwrap();
        let rule = &spec.rules.unwrap()[0];
        assert_eq!(rule.host.as_deref(), Some("alice.example.test"));
        let path = &rule.http.as_ref().unwrap().paths[0];
        assert_eq!(path.path.as_deref(), Some("/"));
        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "alice-vscode-server");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(8443));
        assert_eq!(
            spec.tls.unwrap()[0].secret_name.as_deref(),
            Some("alice.example.test")
        );
    }
}
