//! What each provisioning stage writes, observed through the store

mod common;

use common::{spec, Harness, DOMAIN_SUFFIX};
use devenv_operator::controller::reconciler::tooling::Language;
use devenv_operator::prelude::*;
use devenv_operator::store::get_typed;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;

async fn install_script(harness: &Harness, name: &str) -> String {
    let cm: ConfigMap = harness.object(&format!("{name}-dev-tools-scripts")).await;
    cm.data.unwrap().remove("install-tools.sh").unwrap()
}

#[tokio::test]
async fn test_each_language_gets_only_its_section() {
    let harness = Harness::new();
    for (language, key) in [
        ("python", "python"),
        ("nodejs", "nodejs"),
        ("go", "go"),
        ("rust", "rust"),
        ("java", "java"),
    ] {
        let name = format!("env-{key}");
        harness.submit(&name, spec(language)).await;
        harness.pass(&name).await.unwrap();

        let script = install_script(&harness, &name).await;
        let selected = Language::parse(language).unwrap();
        for other in Language::ALL {
            assert_eq!(
                script.contains(other.heading()),
                other == selected,
                "{language} script and {other:?} section"
            );
        }
    }
}

#[tokio::test]
async fn test_unknown_language_installs_base_tools_only() {
    let harness = Harness::new();
    harness.submit("alice", spec("Python")).await;
    harness.pass("alice").await.unwrap();

    let script = install_script(&harness, "alice").await;
    assert!(script.starts_with("#!/bin/bash"));
    assert!(script.contains("build-essential"));
    for language in Language::ALL {
        assert!(!script.contains(language.heading()));
    }
    assert!(script.ends_with("echo \"Development tools installation complete!\"\n"));
}

#[tokio::test]
async fn test_dependencies_follow_the_language_section() {
    let harness = Harness::new();
    let mut env_spec = spec("go");
    env_spec.dependencies = vec![
        DependencySpec {
            name: "jq".to_string(),
            version: String::new(),
        },
        DependencySpec {
            name: "htop".to_string(),
            version: "3.2.2".to_string(),
        },
    ];
    harness.submit("alice", env_spec).await;
    harness.pass("alice").await.unwrap();

    let script = install_script(&harness, "alice").await;
    let go = script.find("GO_VERSION=1.21.5").unwrap();
    let jq = script.find("sudo apt-get install -y jq\n").unwrap();
    let htop = script.find("sudo apt-get install -y htop=3.2.2").unwrap();
    let cleanup = script.find("# Clean up").unwrap();
    assert!(go < jq && jq < htop && htop < cleanup);
}

#[tokio::test]
async fn test_namespace_and_certificate() {
    let harness = Harness::new();
    harness.submit("alice", spec("go")).await;
    harness.pass("alice").await.unwrap();

    let ns: Namespace = get_typed(harness.store.as_ref(), None, "devenv-alice")
        .await
        .unwrap();
    let labels = ns.metadata.labels.unwrap();
    assert_eq!(labels["environment"], "alice");

    let host = format!("alice.{DOMAIN_SUFFIX}");
    let cert: Certificate = harness.object(&host).await;
    assert_eq!(cert.spec.secret_name, host);
    assert_eq!(cert.spec.common_name.as_deref(), Some(host.as_str()));
    assert!(cert.spec.is_ca);
    assert_eq!(cert.spec.issuer_ref.name, "selfsigned-cluster-issuer");

    let issuer: Issuer = harness.object("selfsigned-cluster-issuer").await;
    assert_eq!(issuer.metadata.namespace.as_deref(), Some(common::NAMESPACE));
}

#[tokio::test]
async fn test_ide_objects_reference_each_other() {
    let harness = Harness::new();
    harness.submit("alice", spec("go")).await;
    harness.pass("alice").await.unwrap();

    let secret: Secret = harness.object("alice-vscode-password").await;
    assert_eq!(secret.data.unwrap()["password"].0, b"changeme".to_vec());

    let deployment: Deployment = harness.object("alice-vscode-server").await;
    let pod = deployment.spec.unwrap().template.spec.unwrap();
    let container = &pod.containers[0];
    assert_eq!(container.image.as_deref(), Some("linuxserver/code-server:4.95.3"));
    let secret_refs: Vec<_> = container
        .env
        .as_ref()
        .unwrap()
        .iter()
        .filter_map(|e| e.value_from.as_ref()?.secret_key_ref.as_ref())
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(secret_refs, ["alice-vscode-password", "alice-vscode-password"]);
    let volumes = pod.volumes.unwrap();
    assert_eq!(
        volumes[1].config_map.as_ref().unwrap().name,
        "alice-dev-tools-scripts"
    );

    let service: Service = harness.object("alice-vscode-server").await;
    assert_eq!(service.spec.unwrap().ports.unwrap()[0].port, 8443);

    let ingress: Ingress = harness.object("alice-vscode-ingress").await;
    let ingress_spec = ingress.spec.unwrap();
    let rule = &ingress_spec.rules.unwrap()[0];
    assert_eq!(rule.host.as_deref(), Some(format!("alice.{DOMAIN_SUFFIX}").as_str()));
    let backend = rule.http.as_ref().unwrap().paths[0].backend.service.as_ref().unwrap();
    assert_eq!(backend.name, "alice-vscode-server");
}

#[tokio::test]
async fn test_post_start_hook_only_with_extensions() {
    let harness = Harness::new();
    harness.submit("plain", spec("go")).await;
    let mut with_extensions = spec("go");
    with_extensions.ide.extensions =
        vec!["golang.go".to_string(), "eamodio.gitlens".to_string()];
    harness.submit("extended", with_extensions).await;
    harness.pass("plain").await.unwrap();
    harness.pass("extended").await.unwrap();

    let plain: Deployment = harness.object("plain-vscode-server").await;
    let container = &plain.spec.unwrap().template.spec.unwrap().containers[0];
    assert!(container.lifecycle.is_none());

    let extended: Deployment = harness.object("extended-vscode-server").await;
    let container = &extended.spec.unwrap().template.spec.unwrap().containers[0];
    let command = container
        .lifecycle
        .as_ref()
        .and_then(|l| l.post_start.as_ref())
        .and_then(|h| h.exec.as_ref())
        .and_then(|e| e.command.clone())
        .unwrap();
    assert_eq!(command[..2], ["/bin/bash", "-c"]);
    assert!(command[2]
        .ends_with("--install-extension golang.go --install-extension eamodio.gitlens"));
}

async fn database(harness: &Harness, name: &str, db_type: &str) -> (Deployment, Service) {
    let mut env_spec = spec("go");
    env_spec.database.db_type = db_type.to_string();
    harness.submit(name, env_spec).await;
    harness.pass(name).await.unwrap();
    (
        harness.object(&format!("{name}-database")).await,
        harness.object(&format!("{name}-database")).await,
    )
}

#[tokio::test]
async fn test_database_dispatch() {
    let harness = Harness::new();

    let (deployment, service) = database(&harness, "pg", "postgres").await;
    let container = &deployment.spec.unwrap().template.spec.unwrap().containers[0];
    assert_eq!(container.image.as_deref(), Some("postgres:16"));
    assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 5432);
    assert_eq!(container.env.as_ref().unwrap().len(), 3);
    assert_eq!(service.spec.unwrap().ports.unwrap()[0].port, 5432);

    let (deployment, service) = database(&harness, "cache", "redis").await;
    let container = &deployment.spec.unwrap().template.spec.unwrap().containers[0];
    assert_eq!(container.image.as_deref(), Some("redis:16"));
    assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 6379);
    assert_eq!(container.env.as_ref().unwrap().len(), 1);
    assert_eq!(service.spec.unwrap().ports.unwrap()[0].port, 6379);

    let (deployment, service) = database(&harness, "odd", "mysql").await;
    let pod = deployment.spec.unwrap().template.spec.unwrap();
    assert!(pod.containers[0].ports.as_ref().is_none_or(Vec::is_empty));
    assert!(pod.containers[0].env.as_ref().is_none_or(Vec::is_empty));
    assert!(pod.volumes.as_ref().is_none_or(Vec::is_empty));
    assert!(service.spec.unwrap().ports.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_omitted_database_still_provisions_a_bare_deployment() {
    let harness = Harness::new();
    let mut env_spec = spec("go");
    env_spec.database = DatabaseSpec::default();
    harness.submit("alice", env_spec).await;
    assert_eq!(harness.pass("alice").await.unwrap(), PassOutcome::Converged);

    let deployment: Deployment = harness.object("alice-database").await;
    let pod = deployment.spec.unwrap().template.spec.unwrap();
    assert_eq!(pod.containers[0].image.as_deref(), Some(":latest"));
    assert!(pod.containers[0].ports.is_none());

    let status = harness.environment("alice").await.unwrap().status.unwrap();
    assert_eq!(status.phase, "Ready");
}
