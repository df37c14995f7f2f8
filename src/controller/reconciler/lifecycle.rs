//! # Lifecycle
//!
//! The finalizer protocol as an explicit two-state machine keyed by
//! (deletion requested?, finalizer present?).
//!
//! | deletion requested | finalizer | state | pass does |
//! | --- | --- | --- | --- |
//! | no | no | `Live` | add finalizer, then provision |
//! | no | yes | `Live` | provision |
//! | yes | yes | `Terminating` | tear down, then release finalizer |
//! | yes | no | `Terminating` | nothing; the store removes the object |

use crate::constants::FINALIZER;
use crate::crd::DeveloperEnvironment;
use crate::store::{get_typed, to_dynamic, ClusterStore, StoreError};
use kube::discovery::ApiResource;
use kube::ResourceExt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Live { finalizer_present: bool },
    Terminating { finalizer_present: bool },
}

impl Lifecycle {
    #[must_use]
    pub fn of(env: &DeveloperEnvironment) -> Self {
        let finalizer_present = has_finalizer(env);
        if env.metadata.deletion_timestamp.is_some() {
            Lifecycle::Terminating { finalizer_present }
        } else {
            Lifecycle::Live { finalizer_present }
        }
    }
}

#[must_use]
pub fn has_finalizer(env: &DeveloperEnvironment) -> bool {
    env.finalizers().iter().any(|f| f == FINALIZER)
}

async fn write_finalizers(
    store: &dyn ClusterStore,
    env: &DeveloperEnvironment,
) -> Result<DeveloperEnvironment, StoreError> {
    let resource = ApiResource::erase::<DeveloperEnvironment>(&());
    let written = store.replace(&resource, &to_dynamic(env)?).await?;
    crate::store::from_dynamic(&written)
}

/// Add the finalizer, refetching and retrying exactly once on a write conflict
pub async fn add_finalizer(
    store: &dyn ClusterStore,
    env: &DeveloperEnvironment,
) -> Result<DeveloperEnvironment, StoreError> {
    let mut next = env.clone();
    next.finalizers_mut().push(FINALIZER.to_string());
    match write_finalizers(store, &next).await {
        Ok(written) => {
            info!(environment = %env.name_any(), "finalizer added");
            Ok(written)
        }
        Err(e) if e.is_conflict() => {
            warn!(environment = %env.name_any(), error = %e, "conflict adding finalizer, refetching");
            let mut latest: DeveloperEnvironment =
                get_typed(store, env.namespace().as_deref(), &env.name_any()).await?;
            if has_finalizer(&latest) {
                return Ok(latest);
            }
            latest.finalizers_mut().push(FINALIZER.to_string());
            write_finalizers(store, &latest).await
        }
        Err(e) => Err(e),
    }
}

/// Release the finalizer so the store can remove the environment
pub async fn remove_finalizer(
    store: &dyn ClusterStore,
    env: &DeveloperEnvironment,
) -> Result<(), StoreError> {
    let mut next = env.clone();
    next.finalizers_mut().retain(|f| f != FINALIZER);
    let resource = ApiResource::erase::<DeveloperEnvironment>(&());
    store.replace(&resource, &to_dynamic(&next)?).await?;
    info!(environment = %env.name_any(), "finalizer released");
    Ok(())
}
