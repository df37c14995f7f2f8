//! # Runtime
//!
//! Process-level wiring around the reconciler.
//!
//! - `initialization`: tracing, metrics, HTTP server and client setup
//! - `watch_loop`: the controller stream and its restart loop
//! - `error_policy`: requeue policy for failed passes and stream errors

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::config::ControllerConfig;
use anyhow::Result;

/// Initialize everything and run until shutdown
///
/// # Errors
///
/// Propagates initialization failures.
pub async fn run(config: ControllerConfig) -> Result<()> {
    let init = initialization::initialize(config).await?;
    watch_loop::run_watch_loop(init.environments, init.reconciler, init.server_state).await
}
