/// Mesh Installer - Istio on GKE
///
/// Installs the Istio control plane onto an existing GKE cluster, waits for its
/// load balancers, then applies the gateway and observability add-on manifests.
mod cli;
mod config;
mod error;
mod gcloud;
mod installer;
mod istio;
mod k8s;
mod platform;
mod utils;

use anyhow::{Context, Result};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::ParseOutcome;
use crate::config::InstallerConfig;
use crate::error::exit;
use crate::installer::Installer;
use crate::platform::Platform;
use crate::utils::checks;
use crate::utils::command::TokioRunner;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mesh_installer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = match run().await {
        Ok(()) => exit::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            error::exit_code_for(&e)
        }
    };

    std::process::exit(code);
}

async fn run() -> Result<()> {
    let platform = Platform::current();

    let cli = match cli::parse(std::env::args_os(), platform.parse_mode())? {
        ParseOutcome::Usage(usage) => {
            println!("{}", usage);
            return Ok(());
        }
        ParseOutcome::Run(cli) => cli,
    };

    let runner = TokioRunner;
    let params = checks::preflight(&runner, cli)?;

    let config = InstallerConfig::load().context("Failed to load installer configuration")?;

    Installer::new(&runner, params, config, platform)
        .run()
        .await?;

    Ok(())
}
