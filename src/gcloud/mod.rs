/// Google Cloud CLI operations
use tracing::info;

use crate::config::InstallParams;
use crate::error::InstallError;
use crate::utils::command::{CommandBuilder, CommandRunner};

/// Wraps the `gcloud` calls the installer needs
pub struct GcloudClient<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> GcloudClient<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Make `project` the active project for subsequent gcloud calls
    pub async fn set_project(&self, project: &str) -> Result<(), InstallError> {
        info!("Setting active project to {}", project);

        CommandBuilder::new("gcloud")
            .args(["config", "set", "project", project])
            .run_silent(self.runner)
            .await
    }

    /// Write kubeconfig credentials for the cluster
    pub async fn get_credentials(&self, params: &InstallParams) -> Result<(), InstallError> {
        info!(
            "Fetching credentials for cluster {} in {}",
            params.cluster_name, params.cluster_region
        );

        CommandBuilder::new("gcloud")
            .args([
                "container",
                "clusters",
                "get-credentials",
                params.cluster_name.as_str(),
                "--region",
                params.cluster_region.as_str(),
                "--project",
                params.project.as_str(),
            ])
            .run_silent(self.runner)
            .await
    }
}
