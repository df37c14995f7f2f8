//! # Reconciler
//!
//! Core reconciliation logic for `DeveloperEnvironment` resources.
//!
//! Each pass converges the objects behind one developer sandbox:
//! - `namespace`: dedicated `devenv-<name>` namespace
//! - `certificate`: shared self-signed issuer and per-environment certificate
//! - `tooling`: rendered install script in a config map
//! - `ide`: VS Code server workspace, password, deployment, service and ingress
//! - `database`: postgres or redis claim, deployment and service
//!
//! Deletion runs `teardown` behind the finalizer handled by `lifecycle`.
//! Every object goes through the single create-or-overwrite routine in `apply`.

pub mod apply;
pub mod certificate;
pub mod common;
pub mod database;
pub mod ide;
pub mod lifecycle;
pub mod naming;
pub mod namespace;
pub mod reconcile;
pub mod status;
pub mod teardown;
pub mod tooling;
pub mod types;

// Re-export public API
pub use reconcile::{reconcile, run_pass, status_echo_delay, PassOutcome};
pub use types::{EnvironmentScope, Reconciler, ReconcilerError, Stage};
