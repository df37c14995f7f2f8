//! # DeveloperEnvironment Spec
//!
//! Desired state submitted by a developer. The controller never writes these fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// DeveloperEnvironment Custom Resource Definition
///
/// One self-service sandbox on the shared cluster: tooling install script,
/// a VS Code server behind TLS ingress and a database. The database is always
/// provisioned; leaving `database` out yields a `:latest` deployment with no
/// ports, env or volumes.
///
/// # Example
///
/// ```yaml
/// apiVersion: api.adityajoshi.online/v1
/// kind: DeveloperEnvironment
/// metadata:
///   name: alice
///   namespace: sandboxes
/// spec:
///   language: python
///   version: "3.12"
///   ide:
///     type: vscode
///     extensions:
///       - ms-python.python
///     passwordSecret: changeme
///   database:
///     type: postgres
///     version: "16"
///   dependencies:
///     - name: jq
///       version: ""
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "DeveloperEnvironment",
    group = "api.adityajoshi.online",
    version = "v1",
    namespaced,
    status = "crate::crd::DeveloperEnvironmentStatus",
    shortname = "devenv",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"URL", "type":"string", "jsonPath":".status.accessURL"}"#,
    printcolumn = r#"{"name":"Language", "type":"string", "jsonPath":".spec.language"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperEnvironmentSpec {
    /// Language toolchain to install: one of nodejs, go, python, java, rust
    /// Any other value installs only the base tools
    pub language: String,
    /// Toolchain version; empty selects the language default
    #[serde(default)]
    pub version: String,
    /// VS Code server configuration
    #[serde(default)]
    pub ide: IdeConfig,
    /// Database backing the environment (postgres or redis; other types get
    /// a bare deployment)
    #[serde(default)]
    pub database: DatabaseSpec,
    /// Extra packages appended to the install script
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

/// IDE and development tool settings
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdeConfig {
    /// IDE flavour (informational; only code-server is provisioned)
    #[serde(default, rename = "type")]
    pub ide_type: String,
    /// Extensions installed by the post-start hook, in order
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Editor settings (accepted, not applied)
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    /// Login password copied verbatim into the `<name>-vscode-password` Secret
    #[serde(default)]
    pub password_secret: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Backend kind: postgres or redis
    #[serde(default, rename = "type")]
    pub db_type: String,
    /// Image tag
    #[serde(default = "default_database_version")]
    pub version: String,
}

impl Default for DatabaseSpec {
    fn default() -> Self {
        Self {
            db_type: String::new(),
            version: default_database_version(),
        }
    }
}

/// Additional tool dependency
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[must_use]
pub fn default_database_version() -> String {
    "latest".to_string()
}
