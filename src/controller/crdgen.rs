//! # CRD Generator
//!
//! Renders the `DeveloperEnvironment` CustomResourceDefinition as YAML from the
//! Rust type definition.
//!
//! ## Usage
//!
//! ```bash
//! devenv-operator crd > config/crd/developerenvironment.yaml
//! devenv-operator crd | kubectl apply -f -
//! ```

use crate::crd::DeveloperEnvironment;
use anyhow::{Context, Result};
use kube::core::CustomResourceExt;

/// CRD YAML for `DeveloperEnvironment`, including the status subresource
///
/// # Errors
///
/// Fails only if the generated definition cannot be serialized.
pub fn crd_yaml() -> Result<String> {
    serde_yaml::to_string(&DeveloperEnvironment::crd())
        .context("Failed to serialize DeveloperEnvironment CRD to YAML")
}
