//! # Watch Loop
//!
//! Controller watch loop that monitors DeveloperEnvironment resources and
//! triggers reconciliation when changes are detected.
//!
//! The runtime serializes passes per object and runs distinct objects
//! concurrently up to the configured limit. Status-only events are filtered in
//! [`crate::controller::reconciler::reconcile`].

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::DeveloperEnvironment;
use crate::runtime::error_policy::{handle_reconciliation_error, log_stream_error};
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{controller, watcher, Controller};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Drive `work` until it completes or shutdown is notified
///
/// Returns `true` on shutdown. The unfinished future is dropped, which cancels
/// every pass it is still polling.
async fn run_until_shutdown<F>(work: F, shutdown: &Notify) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        () = work => false,
        () = shutdown.notified() => true,
    }
}

/// Run the controller watch loop until a shutdown signal arrives
///
/// Passes still running when the signal arrives are cancelled, not awaited.
///
/// # Errors
///
/// Currently never fails; stream failures restart the watch.
pub async fn run_watch_loop(
    environments: Api<DeveloperEnvironment>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let restart_delay = reconciler.config.watch_restart_delay_duration();
    let concurrency = reconciler.config.max_concurrent_reconciliations;
    let shutdown = Arc::new(Notify::new());

    let shutdown_state = server_state.clone();
    let shutdown_notify = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), stopping controller...");
        shutdown_state.set_ready(false);
        shutdown_notify.notify_one();
    });

    server_state.set_ready(true);
    loop {
        info!(concurrency, "Starting controller watch loop...");
        let stream = Controller::new(
            environments.clone(),
            watcher::Config::default().any_semantic(),
        )
        .with_config(controller::Config::default().concurrency(concurrency))
        .run(reconcile, handle_reconciliation_error, reconciler.clone())
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!(object = %object, action = ?action, "watch.event.reconciled");
                }
                Err(e) => log_stream_error(&e),
            }
        });

        if run_until_shutdown(stream, &shutdown).await {
            break;
        }
        warn!(
            restart_secs = restart_delay.as_secs(),
            "Controller watch stream ended, restarting..."
        );
        if run_until_shutdown(tokio::time::sleep(restart_delay), &shutdown).await {
            break;
        }
    }

    info!("Controller stopped, in-flight reconciliations dropped");
    Ok(())
}
