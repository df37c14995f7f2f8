//! # Prelude
//!
//! Re-exports commonly used types for convenience.
//!
//! ```rust
//! use devenv_operator::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    reconcile, run_pass, status_echo_delay, EnvironmentScope, PassOutcome, Reconciler,
    ReconcilerError, Stage,
};

// Config types
pub use crate::config::ControllerConfig;

// Store seam and its implementations
pub use crate::store::{ClusterStore, KubeStore, MemoryStore, ObjectRef, StoreError};
