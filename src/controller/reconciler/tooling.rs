//! # Tooling Script
//!
//! Renders the `install-tools.sh` script from the environment spec and stores it
//! in the `<name>-dev-tools-scripts` config map, which the IDE deployment mounts
//! as an executable volume.
//!
//! Rendering is a pure function of the environment spec: equal specs produce the
//! same bytes. A language outside [`Language`] yields only the base section.
//! Dependency names and versions are emitted verbatim without shell quoting.

use super::apply::{ensure, ObjectSpec};
use super::naming;
use super::types::EnvironmentScope;
use crate::constants::INSTALL_SCRIPT_KEY;
use crate::crd::{DependencySpec, DeveloperEnvironmentSpec};
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

const BASE_SECTION: &str = r"#!/bin/bash
echo $SUDO_PASSWORD | sudo -S -v
export DEBIAN_FRONTEND=noninteractive
# Update package lists
sudo apt-get update

# Install core development tools
sudo apt-get install -y \
    git \
    curl \
    wget \
    build-essential \
    software-properties-common \
    ca-certificates \
    gnupg \
    lsb-release

# Install language-specific tools based on environment configuration";

const DEPENDENCIES_HEADER: &str = "\n\n# Install additional tools specified in the environment";

const CLEANUP_SECTION: &str = r#"

# Clean up
sudo apt-get clean
sudo rm -rf /var/lib/apt/lists/*

echo "Development tools installation complete!"
"#;

/// Languages with a dedicated install section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    NodeJs,
    Go,
    Rust,
    Java,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::NodeJs,
        Language::Go,
        Language::Rust,
        Language::Java,
    ];

    /// Exact, case-sensitive match on `spec.language`
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "python" => Some(Language::Python),
            "nodejs" => Some(Language::NodeJs),
            "go" => Some(Language::Go),
            "rust" => Some(Language::Rust),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    #[must_use]
    pub fn default_version(&self) -> &'static str {
        match self {
            Language::Python => "3",
            Language::NodeJs => "lts",
            Language::Go => "1.21.5",
            Language::Rust => "stable",
            Language::Java => "17",
        }
    }

    /// Comment line opening this language's section
    #[must_use]
    pub fn heading(&self) -> &'static str {
        match self {
            Language::Python => "# Python tools",
            Language::NodeJs => "# Node.js and npm using nvm",
            Language::Go => "# Go language",
            Language::Rust => "# Rust toolchain",
            Language::Java => "# Java development kit",
        }
    }

    fn body(&self) -> &'static str {
        match self {
            Language::Python => {
                "PYTHON_VERSION={v}
sudo apt-get install -y python${PYTHON_VERSION} python${PYTHON_VERSION}-pip python${PYTHON_VERSION}-venv
pip${PYTHON_VERSION} install --upgrade pip
pip${PYTHON_VERSION} install poetry virtualenv"
            }
            Language::NodeJs => {
                r#"NODEJS_VERSION={v}
curl -o- https://raw.githubusercontent.com/nvm-sh/nvm/v0.39.4/install.sh | bash
export NVM_DIR="$HOME/.nvm"
[ -s "$NVM_DIR/nvm.sh" ] && \. "$NVM_DIR/nvm.sh"
nvm install ${NODEJS_VERSION}
nvm use ${NODEJS_VERSION}
npm install -g yarn pnpm"#
            }
            Language::Go => {
                "GO_VERSION={v}
wget https://golang.org/dl/go${GO_VERSION}.linux-amd64.tar.gz
sudo tar -C /usr/local -xzf go${GO_VERSION}.linux-amd64.tar.gz
sudo rm go${GO_VERSION}.linux-amd64.tar.gz
echo 'export PATH=$PATH:/usr/local/go/bin' >> ~/.bashrc"
            }
            Language::Rust => {
                "RUST_VERSION={v}
sudo curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y --default-toolchain ${RUST_VERSION}"
            }
            Language::Java => {
                "JAVA_VERSION={v}
sudo apt-get install -y openjdk-${JAVA_VERSION}-jdk"
            }
        }
    }

    /// Section text with the version substituted, falling back to the default
    #[must_use]
    pub fn section(&self, version: &str) -> String {
        let version = if version.is_empty() {
            self.default_version()
        } else {
            version
        };
        format!("{}\n{}", self.heading(), self.body().replacen("{v}", version, 1))
    }
}

/// `apt-get` line for one extra package, pinned when a version is given
fn install_line(dependency: &DependencySpec) -> String {
    if dependency.version.is_empty() {
        format!("\nsudo apt-get install -y {}", dependency.name)
    } else {
        format!(
            "\nsudo apt-get install -y {}={}",
            dependency.name, dependency.version
        )
    }
}

/// Render the install script for a spec
#[must_use]
pub fn render_install_script(spec: &DeveloperEnvironmentSpec) -> String {
    let mut script = String::from(BASE_SECTION);

    if let Some(language) = Language::parse(&spec.language) {
        script.push('\n');
        script.push_str(&language.section(&spec.version));
    }

    script.push_str(DEPENDENCIES_HEADER);
    for dependency in &spec.dependencies {
        script.push_str(&install_line(dependency));
    }

    script.push_str(CLEANUP_SECTION);
    script
}

#[must_use]
pub fn desired_config_map(scope: &EnvironmentScope, spec: &DeveloperEnvironmentSpec) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(naming::tools_config_map_name(&scope.name)),
            namespace: Some(scope.namespace.clone()),
            labels: Some(BTreeMap::from([
                ("developer-env".to_string(), scope.name.clone()),
                ("developer-env-uid".to_string(), scope.uid.clone()),
                ("app".to_string(), "development-tools".to_string()),
            ])),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            INSTALL_SCRIPT_KEY.to_string(),
            render_install_script(spec),
        )])),
        ..Default::default()
    }
}

fn copy_config_map(live: &mut ConfigMap, desired: &ConfigMap) {
    live.data.clone_from(&desired.data);
    live.metadata.labels.clone_from(&desired.metadata.labels);
}

pub async fn ensure_tooling(
    store: &dyn ClusterStore,
    scope: &EnvironmentScope,
    spec: &DeveloperEnvironmentSpec,
) -> anyhow::Result<()> {
    ensure(
        store,
        ObjectSpec::overwrite(desired_config_map(scope, spec), copy_config_map),
    )
    .await?;
    Ok(())
}
