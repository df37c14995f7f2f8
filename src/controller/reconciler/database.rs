//! # Database Provisioner
//!
//! Manages the `<name>-db-pvc` claim, the single-replica `<name>-database`
//! deployment and its service. The backend is picked by `spec.database.type`:
//! postgres and redis each carry a fixed port, fixed credentials and a data
//! mount. Any other value still gets a deployment running `<type>:<version>`
//! but no ports, env vars or volumes, and the service exposes nothing.

use super::apply::{ensure, ObjectSpec};
use super::common::{
    app_labels, copy_claim_requests, copy_deployment_spec, copy_service_spec, volume_claim,
};
use super::naming;
use super::types::EnvironmentScope;
use crate::crd::DatabaseSpec;
use crate::store::ClusterStore;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PersistentVolumeClaim, PersistentVolumeClaimVolumeSource,
    PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;

const APP: &str = "database";
const DATA_VOLUME: &str = "db-data";
const PORT_NAME: &str = "db";

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Postgres,
    Redis,
}

impl DatabaseKind {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "postgres" => Some(DatabaseKind::Postgres),
            "redis" => Some(DatabaseKind::Redis),
            _ => None,
        }
    }

    #[must_use]
    pub fn port(&self) -> i32 {
        match self {
            DatabaseKind::Postgres => 5432,
            DatabaseKind::Redis => 6379,
        }
    }

    /// Hard-coded credentials, exposed as plain env vars
    #[must_use]
    pub fn env(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            DatabaseKind::Postgres => vec![
                ("POSTGRES_DB", "postgres"),
                ("POSTGRES_USER", "postgres"),
                ("POSTGRES_PASSWORD", "postgres"),
            ],
            DatabaseKind::Redis => vec![("REDIS_PASSWORD", "password")],
        }
    }

    /// Data mount path and optional sub-path inside the claim
    #[must_use]
    pub fn data_mount(&self) -> (&'static str, Option<&'static str>) {
        match self {
            // postgres refuses a non-empty data dir, and a fresh claim has lost+found
            DatabaseKind::Postgres => ("/var/lib/postgresql/data", Some("pgdata")),
            DatabaseKind::Redis => ("/data", None),
        }
    }
}

#[must_use]
pub fn desired_claim(scope: &EnvironmentScope) -> PersistentVolumeClaim {
    volume_claim(
        naming::database_claim_name(&scope.name),
        &scope.namespace,
        app_labels(APP, &scope.name),
    )
}

#[must_use]
pub fn desired_deployment(scope: &EnvironmentScope, database: &DatabaseSpec) -> Deployment {
    let labels = app_labels(APP, &scope.name);
    let kind = DatabaseKind::parse(&database.db_type);

    let mut container = Container {
        name: APP.to_string(),
        image: Some(format!("{}:{}", database.db_type, database.version)),
        ..Default::default()
    };
    let mut volumes = None;
    if let Some(kind) = kind {
        let (mount_path, sub_path) = kind.data_mount();
        container.ports = Some(vec![ContainerPort {
            name: Some(PORT_NAME.to_string()),
            container_port: kind.port(),
            ..Default::default()
        }]);
        container.env = Some(
            kind.env()
                .into_iter()
                .map(|(name, value)| EnvVar {
                    name: name.to_string(),
                    value: Some(value.to_string()),
                    ..Default::default()
                })
                .collect(),
        );
        container.volume_mounts = Some(vec![VolumeMount {
            name: DATA_VOLUME.to_string(),
            mount_path: mount_path.to_string(),
            sub_path: sub_path.map(str::to_string),
            ..Default::default()
        }]);
        volumes = Some(vec![Volume {
            name: DATA_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: naming::database_claim_name(&scope.name),
                ..Default::default()
            }),
            ..Default::default()
        }]);
    }

    Deployment {
        metadata: ObjectMeta {
            name: Some(naming::database_name(&scope.name)),
            namespace: Some(scope.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes,
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[must_use]
pub fn desired_service(scope: &EnvironmentScope, database: &DatabaseSpec) -> Service {
    let labels = app_labels(APP, &scope.name);
    let ports = DatabaseKind::parse(&database.db_type)
        .map(|kind| ServicePort {
            name: Some(PORT_NAME.to_string()),
            port: kind.port(),
            target_port: Some(IntOrString::Int(kind.port())),
            ..Default::default()
        })
        .into_iter()
        .collect();

    Service {
        metadata: ObjectMeta {
            name: Some(naming::database_name(&scope.name)),
            namespace: Some(scope.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(ports),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub async fn ensure_database(
    store: &dyn ClusterStore,
    scope: &EnvironmentScope,
    database: &DatabaseSpec,
) -> anyhow::Result<()> {
    ensure(
        store,
        ObjectSpec::overwrite(desired_claim(scope), copy_claim_requests),
    )
    .await?;
    ensure(
        store,
        ObjectSpec::overwrite(desired_deployment(scope, database), copy_deployment_spec),
    )
    .await?;
    ensure(
        store,
        ObjectSpec::overwrite(desired_service(scope, database), copy_service_spec),
    )
    .await?;
    Ok(())
}
