//! # Cluster State Store
//!
//! The external store holding every managed object, seen through an async trait
//! over untyped objects so the reconciler can run against the Kubernetes API
//! (`KubeStore`) or an in-process store (`MemoryStore`).
//!
//! Typed objects (`k8s-openapi` kinds, cert-manager kinds, the
//! `DeveloperEnvironment` CRD) cross this boundary through [`to_dynamic`] and
//! [`from_dynamic`].

use async_trait::async_trait;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::{MemoryStore, Verb};

/// Errors surfaced by a [`ClusterStore`]
///
/// `NotFound` and `AlreadyExists` are benign for the reconciler and steer the
/// create/overwrite path; everything else aborts the current pass.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: String, name: String },
    #[error("conflict writing {kind} {name}: {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },
    #[error("store rejected {verb} of {kind} {name}: {message}")]
    Rejected {
        verb: String,
        kind: String,
        name: String,
        message: String,
    },
    #[error("failed to convert {kind}: {source}")]
    Serialization {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),
}

impl StoreError {
    /// Classify a kube client error by HTTP status code
    #[must_use]
    pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                StoreError::AlreadyExists {
                    kind: kind.to_string(),
                    name: name.to_string(),
                }
            }
            kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: ae.message,
            },
            other => StoreError::Kube(other),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Create/get/replace/delete access to the cluster state store
///
/// Namespaced objects carry their namespace in `metadata.namespace`; cluster
/// scoped objects (e.g. `Namespace`) use `None`.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Read one object
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError>;

    /// Create an object; fails with `AlreadyExists` if the name is taken
    async fn create(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError>;

    /// Replace an object; fails with `Conflict` if `metadata.resourceVersion`
    /// is set and stale
    async fn replace(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError>;

    /// Request deletion of an object
    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError>;

    /// Merge-patch the status sub-resource
    async fn patch_status(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        status: &serde_json::Value,
    ) -> Result<(), StoreError>;
}

/// Identity of one managed object: kind, namespace and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub resource: ApiResource,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectRef {
    /// Reference to a typed kind
    pub fn of<K>(namespace: Option<&str>, name: impl Into<String>) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self {
            resource: ApiResource::erase::<K>(&()),
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.resource.kind, ns, self.name),
            None => write!(f, "{} {}", self.resource.kind, self.name),
        }
    }
}

/// Convert a typed object into the untyped form the store speaks
pub fn to_dynamic<K>(object: &K) -> Result<DynamicObject, StoreError>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|source| StoreError::Serialization {
            kind: K::kind(&()).to_string(),
            source,
        })
}

/// Convert an untyped object back into its typed form
pub fn from_dynamic<K>(object: &DynamicObject) -> Result<K, StoreError>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    let mut value = serde_json::to_value(object).map_err(|source| StoreError::Serialization {
        kind: K::kind(&()).to_string(),
        source,
    })?;
    // typed kinds insist on apiVersion/kind; list results may omit them
    if let Some(map) = value.as_object_mut() {
        map.entry("apiVersion")
            .or_insert_with(|| K::api_version(&()).into());
        map.entry("kind").or_insert_with(|| K::kind(&()).into());
    }
    serde_json::from_value(value).map_err(|source| StoreError::Serialization {
        kind: K::kind(&()).to_string(),
        source,
    })
}

/// Fetch a typed object
pub async fn get_typed<K>(
    store: &dyn ClusterStore,
    namespace: Option<&str>,
    name: &str,
) -> Result<K, StoreError>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    let resource = ApiResource::erase::<K>(&());
    let object = store.get(&resource, namespace, name).await?;
    from_dynamic(&object)
}
