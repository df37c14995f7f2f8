//! # Configuration
//!
//! Controller-level settings. Values come from environment variables (populated
//! from a ConfigMap via `envFrom`) and can be overridden by CLI flags.

mod controller;

pub use controller::ControllerConfig;
