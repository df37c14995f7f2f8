//! DevEnv Operator Library
//!
//! This library provides the core functionality of the DevEnv operator, which
//! turns a `DeveloperEnvironment` resource into a working developer sandbox:
//! namespace, TLS certificate, tooling script, VS Code server and database.
//!
//! ## Quick Start
//!
//! ```rust
//! use devenv_operator::prelude::*;
//! ```
//!
//! This brings commonly used types into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod store;
