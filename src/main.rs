//! # DevEnv Operator
//!
//! A Kubernetes operator that provisions self-service developer environments.
//!
//! ## Overview
//!
//! For every `DeveloperEnvironment` resource the operator:
//!
//! 1. **Creates a namespace** - `devenv-<name>`, labelled for discovery
//! 2. **Issues a certificate** - self-signed via cert-manager for `<name>.<suffix>`
//! 3. **Renders a tooling script** - language toolchain and extra packages
//! 4. **Runs a VS Code server** - workspace volume, password secret, service and TLS ingress
//! 5. **Runs a database** - postgres or redis with its own volume and service
//!
//! Deleting the resource tears all of this down behind a finalizer.
//!
//! ## Usage
//!
//! ```bash
//! devenv-operator run --metrics-port 8080
//! devenv-operator crd | kubectl apply -f -
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use devenv_operator::config::ControllerConfig;
use devenv_operator::controller::crdgen;
use devenv_operator::runtime::{self, initialization};

/// DevEnv operator
#[derive(Debug, Parser)]
#[command(name = "devenv-operator", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP port for /metrics, /healthz and /readyz (overrides METRICS_PORT)
    #[arg(long, global = true)]
    metrics_port: Option<u16>,

    /// Only watch this namespace (overrides WATCH_NAMESPACE)
    #[arg(long, global = true)]
    namespace: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the controller (default)
    Run,
    /// Print the DeveloperEnvironment CRD as YAML
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Crd => {
            print!("{}", crdgen::crd_yaml()?);
            Ok(())
        }
        Command::Run => {
            let mut config = ControllerConfig::from_env();
            if let Some(port) = cli.metrics_port {
                config.metrics_port = port;
            }
            if let Some(namespace) = cli.namespace {
                config.watch_namespace = Some(namespace);
            }
            initialization::init_tracing(&config)?;
            runtime::run(config).await
        }
    }
}
