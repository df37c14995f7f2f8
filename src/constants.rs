//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! Names and values listed here are part of the contract with objects already
//! present in clusters; changing them orphans existing sub-objects.

/// Finalizer marker guarding external cleanup
pub const FINALIZER: &str = "finalizer.devenv.adityajoshi.online";

/// Default domain suffix for certificate and ingress hosts
pub const DEFAULT_DOMAIN_SUFFIX: &str = "developerenv.adityajoshi.online";

/// Field manager / label value identifying this controller
pub const MANAGER_NAME: &str = "devenv-operator";

/// Phase written after a fully successful provisioning chain
pub const PHASE_READY: &str = "Ready";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Requeue interval after a failed pass (seconds)
pub const DEFAULT_ERROR_REQUEUE_SECS: u64 = 60;

/// Requeue interval after a successful pass (seconds)
pub const DEFAULT_SUCCESS_REQUEUE_SECS: u64 = 600;

/// Default delay before restarting the watch stream (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default maximum number of concurrent passes
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Shared self-signed issuer, one per namespace
pub const ISSUER_NAME: &str = "selfsigned-cluster-issuer";

/// Certificate private key
pub const CERTIFICATE_KEY_ALGORITHM: &str = "ECDSA";
pub const CERTIFICATE_KEY_SIZE: i32 = 256;

/// Tooling script key inside the config map
pub const INSTALL_SCRIPT_KEY: &str = "install-tools.sh";

/// VS Code server
pub const IDE_IMAGE: &str = "linuxserver/code-server:4.95.3";
pub const IDE_PORT: i32 = 8443;
pub const IDE_WORKSPACE_MOUNT: &str = "/config/workspace";
pub const IDE_TOOLS_MOUNT: &str = "/config/tools";
pub const IDE_PASSWORD_KEY: &str = "password";
pub const INGRESS_CLASS: &str = "nginx";

/// Size of the workspace and database claims
pub const VOLUME_SIZE: &str = "10Gi";
