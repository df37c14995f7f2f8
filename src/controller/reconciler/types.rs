//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::crd::DeveloperEnvironment;
use crate::store::ClusterStore;
use kube::ResourceExt;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to the controller runtime
///
/// Every variant is retried by the error policy; there is no terminal class.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to fetch DeveloperEnvironment {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: crate::store::StoreError,
    },

    #[error("failed to update finalizer on {name}: {source}")]
    Finalizer {
        name: String,
        #[source]
        source: crate::store::StoreError,
    },

    #[error("provisioning stage '{stage}' failed: {source:#}")]
    Provisioning {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("teardown failed: {0:#}")]
    Teardown(#[source] anyhow::Error),

    #[error("failed to update status of {name}: {source}")]
    Status {
        name: String,
        #[source]
        source: crate::store::StoreError,
    },

    #[error("DeveloperEnvironment is missing {0}")]
    InvalidObject(&'static str),
}

/// Provisioning stages, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Namespace,
    Certificate,
    Tooling,
    Ide,
    Database,
}

impl Stage {
    pub const ORDERED: [Stage; 5] = [
        Stage::Namespace,
        Stage::Certificate,
        Stage::Tooling,
        Stage::Ide,
        Stage::Database,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Namespace => "namespace",
            Stage::Certificate => "certificate",
            Stage::Tooling => "tooling",
            Stage::Ide => "ide",
            Stage::Database => "database",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one environment plus the values its object names derive from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentScope {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    pub domain_suffix: String,
}

impl EnvironmentScope {
    /// # Errors
    ///
    /// Returns [`ReconcilerError::InvalidObject`] when the environment has no
    /// name or namespace.
    pub fn of(env: &DeveloperEnvironment, domain_suffix: &str) -> Result<Self, ReconcilerError> {
        let name = env
            .metadata
            .name
            .clone()
            .ok_or(ReconcilerError::InvalidObject("metadata.name"))?;
        let namespace = env
            .namespace()
            .ok_or(ReconcilerError::InvalidObject("metadata.namespace"))?;
        Ok(Self {
            name,
            namespace,
            uid: env.uid().unwrap_or_default(),
            domain_suffix: domain_suffix.to_string(),
        })
    }

    /// `<name>.<suffix>`, shared by the certificate, its TLS secret and the ingress host
    #[must_use]
    pub fn host(&self) -> String {
        super::naming::host_name(&self.name, &self.domain_suffix)
    }

    #[must_use]
    pub fn access_url(&self) -> String {
        format!("https://{}", self.host())
    }
}

/// Shared context handed to every reconciliation pass
#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn ClusterStore>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: Arc<dyn ClusterStore>, config: ControllerConfig) -> Self {
        Self { store, config }
    }
}
