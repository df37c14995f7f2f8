//! # Reconcile
//!
//! One pass for one DeveloperEnvironment:
//!
//! 1. Fetch the current object; gone means nothing to do.
//! 2. Terminating with the finalizer: tear down, release the finalizer, stop.
//! 3. Live without the finalizer: add it (one refetch-and-retry on conflict).
//! 4. Provision namespace, certificate, tooling, IDE, database, in that order,
//!    stopping at the first failing stage.
//! 5. Mark the environment ready.
//!
//! Success requeues after the success interval, errors after the error
//! interval (see the error policy), and a finished teardown waits for the next
//! change.

use super::lifecycle::{add_finalizer, has_finalizer, remove_finalizer, Lifecycle};
use super::types::{EnvironmentScope, Reconciler, ReconcilerError, Stage};
use super::{certificate, database, ide, namespace, status, teardown, tooling};
use crate::config::ControllerConfig;
use crate::crd::DeveloperEnvironment;
use crate::observability;
use crate::store::{get_typed, ClusterStore};
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, Instrument};

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The environment no longer exists or is already released
    Gone,
    /// Teardown finished and the finalizer was released
    Finalized,
    /// Every stage converged and status was written
    Converged,
}

impl PassOutcome {
    #[must_use]
    pub fn action(&self, config: &ControllerConfig) -> Action {
        match self {
            PassOutcome::Converged => Action::requeue(config.success_requeue_duration()),
            PassOutcome::Gone | PassOutcome::Finalized => Action::await_change(),
        }
    }
}

/// Remaining quiet time when an event is only the echo of our own status write
///
/// Deletions, spec changes, first passes and periodic passes never count as echoes.
#[must_use]
pub fn status_echo_delay(
    env: &DeveloperEnvironment,
    success_interval: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if env.metadata.deletion_timestamp.is_some() || !has_finalizer(env) {
        return None;
    }
    let status = env.status.as_ref()?;
    if status.observed_generation.is_none() || status.observed_generation != env.metadata.generation
    {
        return None;
    }
    let age = (now - status.last_updated_time()?).to_std().unwrap_or_default();
    success_interval.checked_sub(age).filter(|left| !left.is_zero())
}

async fn provision(
    store: &dyn ClusterStore,
    scope: &EnvironmentScope,
    env: &DeveloperEnvironment,
    stage: Stage,
) -> anyhow::Result<()> {
    match stage {
        Stage::Namespace => namespace::ensure_namespace(store, scope).await,
        Stage::Certificate => certificate::ensure_certificate(store, scope).await,
        Stage::Tooling => tooling::ensure_tooling(store, scope, &env.spec).await,
        Stage::Ide => ide::ensure_ide(store, scope, &env.spec).await,
        Stage::Database => database::ensure_database(store, scope, &env.spec.database).await,
    }
}

/// Run one pass for `namespace/name`
///
/// # Errors
///
/// Any store failure other than "not found" on the initial fetch, tagged with
/// the step that hit it.
pub async fn run_pass(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
) -> Result<PassOutcome, ReconcilerError> {
    let store = ctx.store.as_ref();

    let env: DeveloperEnvironment = match get_typed(store, Some(namespace), name).await {
        Ok(env) => env,
        Err(e) if e.is_not_found() => {
            debug!("DeveloperEnvironment no longer exists");
            return Ok(PassOutcome::Gone);
        }
        Err(source) => {
            return Err(ReconcilerError::Fetch {
                name: name.to_string(),
                source,
            })
        }
    };
    let scope = EnvironmentScope::of(&env, &ctx.config.domain_suffix)?;

    let env = match Lifecycle::of(&env) {
        Lifecycle::Terminating {
            finalizer_present: true,
        } => {
            info!("DeveloperEnvironment is being deleted, tearing down");
            teardown::teardown(store, &scope)
                .await
                .map_err(ReconcilerError::Teardown)?;
            remove_finalizer(store, &env)
                .await
                .map_err(|source| ReconcilerError::Finalizer {
                    name: scope.name.clone(),
                    source,
                })?;
            observability::metrics::increment_teardowns();
            return Ok(PassOutcome::Finalized);
        }
        Lifecycle::Terminating {
            finalizer_present: false,
        } => return Ok(PassOutcome::Gone),
        Lifecycle::Live {
            finalizer_present: false,
        } => add_finalizer(store, &env)
            .await
            .map_err(|source| ReconcilerError::Finalizer {
                name: scope.name.clone(),
                source,
            })?,
        Lifecycle::Live {
            finalizer_present: true,
        } => env,
    };

    for stage in Stage::ORDERED {
        provision(store, &scope, &env, stage)
            .await
            .map_err(|source| ReconcilerError::Provisioning { stage, source })?;
        debug!(stage = %stage, "stage converged");
    }

    status::mark_ready(store, &env, &scope)
        .await
        .map_err(|source| ReconcilerError::Status {
            name: scope.name.clone(),
            source,
        })?;

    Ok(PassOutcome::Converged)
}

/// Entry point handed to the controller runtime
pub async fn reconcile(
    env: Arc<DeveloperEnvironment>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = env.name_any();
    let namespace = env.namespace().unwrap_or_default();
    let span = info_span!(
        "reconcile",
        resource.name = %name,
        resource.namespace = %namespace,
        resource.generation = env.metadata.generation.unwrap_or(0),
    );

    async move {
        if let Some(delay) =
            status_echo_delay(&env, ctx.config.success_requeue_duration(), Utc::now())
        {
            debug!(requeue_secs = delay.as_secs(), "skipping status echo");
            observability::metrics::increment_requeues("status-echo");
            return Ok(Action::requeue(delay));
        }

        observability::metrics::increment_reconciliations();
        let start = Instant::now();
        let result = run_pass(&ctx, &namespace, &name).await;
        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        let outcome = result?;
        match outcome {
            PassOutcome::Converged => {
                info!(
                    duration_secs = start.elapsed().as_secs_f64(),
                    next_secs = ctx.config.success_requeue_secs,
                    "✅ DeveloperEnvironment ready"
                );
                observability::metrics::increment_requeues("success");
            }
            PassOutcome::Finalized => info!("DeveloperEnvironment released"),
            PassOutcome::Gone => {}
        }
        Ok(outcome.action(&ctx.config))
    }
    .instrument(span)
    .await
}
