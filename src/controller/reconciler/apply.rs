//! # Create-or-Overwrite
//!
//! One routine converges every managed sub-object. Each object is declared as an
//! [`ObjectSpec`]: the desired typed object (named by a function from
//! [`super::naming`]), an [`UpdatePolicy`] and a copier that moves the mutable
//! portion of the desired object onto the live one.
//!
//! Overwrite replaces that portion wholesale, so any out-of-band edit is
//! reverted on the next pass. Concurrent external writers race with this
//! overwrite and the last writer wins; only a real difference triggers a write.

use crate::observability;
use crate::store::{from_dynamic, to_dynamic, ClusterStore, ObjectRef, StoreError};
use anyhow::Context;
use kube::discovery::ApiResource;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

/// What to do when the object already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Never touch an existing object
    CreateOnly,
    /// Copy the mutable fields from the desired object
    Overwrite,
}

/// Result of converging one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
}

impl ApplyOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Created => "created",
            ApplyOutcome::Updated => "updated",
            ApplyOutcome::Unchanged => "unchanged",
        }
    }
}

/// Declaration of one managed object
pub struct ObjectSpec<K> {
    pub desired: K,
    pub policy: UpdatePolicy,
    pub copy_mutable: fn(&mut K, &K),
}

impl<K> std::fmt::Debug for ObjectSpec<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectSpec")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<K> ObjectSpec<K> {
    /// Object that is created once and never updated
    pub fn create_only(desired: K) -> Self {
        Self {
            desired,
            policy: UpdatePolicy::CreateOnly,
            copy_mutable: |_, _| {},
        }
    }

    /// Object whose mutable portion is overwritten on every pass
    pub fn overwrite(desired: K, copy_mutable: fn(&mut K, &K)) -> Self {
        Self {
            desired,
            policy: UpdatePolicy::Overwrite,
            copy_mutable,
        }
    }
}

impl<K> ObjectSpec<K>
where
    K: Resource<DynamicType = ()>,
{
    /// Identity of the declared object
    pub fn object_ref(&self) -> ObjectRef {
        let meta = self.desired.meta();
        ObjectRef::of::<K>(
            meta.namespace.as_deref(),
            meta.name.clone().unwrap_or_default(),
        )
    }
}

/// Converge one object: create if absent, otherwise apply the update policy
pub async fn ensure_object<K>(
    store: &dyn ClusterStore,
    spec: &ObjectSpec<K>,
) -> Result<ApplyOutcome, StoreError>
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone,
{
    let resource = ApiResource::erase::<K>(&());
    let target = spec.object_ref();

    let outcome = match store
        .get(&resource, target.namespace.as_deref(), &target.name)
        .await
    {
        Ok(live) => overwrite(store, &resource, spec, &live).await?,
        Err(e) if e.is_not_found() => {
            match store.create(&resource, &to_dynamic(&spec.desired)?).await {
                Ok(_) => ApplyOutcome::Created,
                Err(e) if e.is_already_exists() => {
                    debug!(object = %target, "created concurrently, falling back to overwrite");
                    let live = store
                        .get(&resource, target.namespace.as_deref(), &target.name)
                        .await?;
                    overwrite(store, &resource, spec, &live).await?
                }
                Err(e) => return Err(e),
            }
        }
        Err(e) => return Err(e),
    };

    match outcome {
        ApplyOutcome::Unchanged => debug!(object = %target, "object up to date"),
        _ => info!(object = %target, outcome = outcome.as_str(), "object converged"),
    }
    observability::metrics::increment_objects_applied(&resource.kind, outcome.as_str());
    Ok(outcome)
}

/// [`ensure_object`] with the object identity attached to any error
pub async fn ensure<K>(
    store: &dyn ClusterStore,
    spec: ObjectSpec<K>,
) -> anyhow::Result<ApplyOutcome>
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone,
{
    ensure_object(store, &spec)
        .await
        .with_context(|| format!("failed to ensure {}", spec.object_ref()))
}

async fn overwrite<K>(
    store: &dyn ClusterStore,
    resource: &ApiResource,
    spec: &ObjectSpec<K>,
    live: &kube::core::DynamicObject,
) -> Result<ApplyOutcome, StoreError>
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone,
{
    if spec.policy == UpdatePolicy::CreateOnly {
        return Ok(ApplyOutcome::Unchanged);
    }
    let current: K = from_dynamic(live)?;
    let mut next = current.clone();
    (spec.copy_mutable)(&mut next, &spec.desired);

    let before = to_dynamic(&current)?;
    let after = to_dynamic(&next)?;
    if before.data == after.data && before.metadata == after.metadata {
        return Ok(ApplyOutcome::Unchanged);
    }
    store.replace(resource, &after).await?;
    Ok(ApplyOutcome::Updated)
}
