//! # Controller
//!
//! Core controller modules for the DevEnv operator.
//!
//! - `crdgen`: CRD generation utility
//! - `reconciler`: Core reconciliation logic
//! - `server`: HTTP server for metrics and health checks

pub mod crdgen;
pub mod reconciler;
pub mod server;
