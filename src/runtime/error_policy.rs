//! # Error Policy
//!
//! Error handling for the controller watch loop: failed passes are requeued
//! after the fixed error interval, and stream errors are classified and logged.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::DeveloperEnvironment;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::{self, Action};
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Requeue a failed pass after the error interval
///
/// There is no backoff and no terminal error class; every failure retries.
pub fn handle_reconciliation_error(
    obj: Arc<DeveloperEnvironment>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let delay = ctx.config.error_requeue_duration();
    error!(
        resource.name = %obj.name_any(),
        resource.namespace = %obj.namespace().unwrap_or_default(),
        error = %error,
        retry_secs = delay.as_secs(),
        "❌ Reconciliation failed"
    );
    observability::metrics::increment_reconciliation_errors();
    observability::metrics::increment_requeues("error");
    Action::requeue(delay)
}

/// Coarse class of an item the controller stream reported as failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// A pass failed; already handled by [`handle_reconciliation_error`]
    Reconcile,
    /// A queued object vanished before its pass ran
    ObjectGone,
    /// The watch itself failed; the runtime re-lists with backoff
    Watch,
}

#[must_use]
pub fn classify_stream_error(
    err: &controller::Error<ReconcilerError, watcher::Error>,
) -> StreamErrorKind {
    match err {
        controller::Error::ReconcilerFailed(..) => StreamErrorKind::Reconcile,
        controller::Error::ObjectNotFound(..) => StreamErrorKind::ObjectGone,
        _ => StreamErrorKind::Watch,
    }
}

/// Log one failed stream item at a level matching its class
pub fn log_stream_error(err: &controller::Error<ReconcilerError, watcher::Error>) {
    match classify_stream_error(err) {
        StreamErrorKind::Reconcile => debug!(error = %err, "watch.event.reconciliation_failed"),
        StreamErrorKind::ObjectGone => {
            debug!(error = %err, "object deleted before reconciliation");
        }
        StreamErrorKind::Watch => warn!(error = %err, "controller watch stream error"),
    }
}
