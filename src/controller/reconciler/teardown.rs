//! # Teardown
//!
//! Deletes every object the provisioners may have created for an environment.
//! Deletion is best-effort per object: "not found" counts as done, any other
//! error aborts the pass and leaves the finalizer in place so the next pass
//! retries. Retries are unbounded, so one object that can never be deleted
//! blocks removal of the environment for good.
//!
//! The shared issuer is deleted along with the environment even though other
//! environments in the same namespace reference it; the next pass of any of
//! them recreates it.

use super::naming;
use super::types::EnvironmentScope;
use crate::constants::ISSUER_NAME;
use crate::crd::{Certificate, Issuer};
use crate::observability;
use crate::store::{ClusterStore, ObjectRef};
use anyhow::Context;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use tracing::{debug, info};

/// Every object an environment may own, in deletion order
#[must_use]
pub fn managed_objects(scope: &EnvironmentScope) -> Vec<ObjectRef> {
    let ns = Some(scope.namespace.as_str());
    let name = scope.name.as_str();
    vec![
        ObjectRef::of::<Namespace>(None, naming::namespace_name(name)),
        ObjectRef::of::<Deployment>(ns, naming::ide_server_name(name)),
        ObjectRef::of::<Service>(ns, naming::ide_server_name(name)),
        ObjectRef::of::<Secret>(ns, naming::ide_password_name(name)),
        ObjectRef::of::<Ingress>(ns, naming::ide_ingress_name(name)),
        ObjectRef::of::<ConfigMap>(ns, naming::tools_config_map_name(name)),
        ObjectRef::of::<PersistentVolumeClaim>(ns, naming::ide_workspace_name(name)),
        ObjectRef::of::<Issuer>(ns, ISSUER_NAME),
        ObjectRef::of::<Certificate>(ns, scope.host()),
        ObjectRef::of::<Deployment>(ns, naming::database_name(name)),
        ObjectRef::of::<Service>(ns, naming::database_name(name)),
        ObjectRef::of::<PersistentVolumeClaim>(ns, naming::database_claim_name(name)),
    ]
}

/// Delete all managed objects, stopping at the first real failure
pub async fn teardown(store: &dyn ClusterStore, scope: &EnvironmentScope) -> anyhow::Result<()> {
    for object in managed_objects(scope) {
        match store
            .delete(&object.resource, object.namespace.as_deref(), &object.name)
            .await
        {
            Ok(()) => {
                debug!(object = %object, "deleted");
                observability::metrics::increment_objects_deleted(&object.resource.kind);
            }
            Err(e) if e.is_not_found() => debug!(object = %object, "already gone"),
            Err(e) => return Err(e).with_context(|| format!("failed to delete {object}")),
        }
    }
    info!(environment = %scope.name, namespace = %scope.namespace, "all managed objects deleted");
    Ok(())
}
