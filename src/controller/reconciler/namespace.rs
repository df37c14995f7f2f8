//! # Namespace Provisioner
//!
//! Ensures the dedicated `devenv-<name>` namespace exists. The namespace is
//! create-only and its contents are never touched here; every other
//! per-environment object lives in the environment's own namespace.

use super::apply::{ensure, ObjectSpec};
use super::naming;
use super::types::EnvironmentScope;
use crate::constants::MANAGER_NAME;
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

#[must_use]
pub fn desired_namespace(scope: &EnvironmentScope) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(naming::namespace_name(&scope.name)),
            labels: Some(BTreeMap::from([
                ("managed-by".to_string(), MANAGER_NAME.to_string()),
                ("environment".to_string(), scope.name.clone()),
            ])),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub async fn ensure_namespace(store: &dyn ClusterStore, scope: &EnvironmentScope) -> anyhow::Result<()> {
    ensure(store, ObjectSpec::create_only(desired_namespace(scope))).await?;
    Ok(())
}
