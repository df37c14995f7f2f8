//! # Custom Resource Definitions
//!
//! CRD types used by the DevEnv operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `DeveloperEnvironment` specification and default values
//! - `status.rs` - Observed state written by the controller
//! - `cert_manager.rs` - cert-manager `Issuer` and `Certificate` (external contract)

mod cert_manager;
mod spec;
mod status;

// Re-export all public types
pub use cert_manager::{
    Certificate, CertificatePrivateKey, CertificateSpec, Issuer, IssuerRef, IssuerSpec,
    SelfSignedIssuer,
};
pub use spec::{
    default_database_version, DatabaseSpec, DependencySpec, DeveloperEnvironment,
    DeveloperEnvironmentSpec, IdeConfig,
};
pub use status::{Condition, DeveloperEnvironmentStatus};
