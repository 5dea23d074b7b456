/// Istio control plane installation through istioctl
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{InstallParams, IstioConfig};
use crate::error::InstallError;
use crate::utils::command::{CommandBuilder, CommandRunner};
use crate::utils::template::TemplateRenderer;

/// Variables available to the operator descriptor template
#[derive(Debug, Serialize)]
pub struct OperatorVars<'a> {
    pub cluster_name: &'a str,
    pub cluster_region: &'a str,
    pub project: &'a str,
    pub istio_version: &'a str,
    pub profile: &'a str,
}

impl<'a> OperatorVars<'a> {
    pub fn new(params: &'a InstallParams, istio: &'a IstioConfig) -> Self {
        Self {
            cluster_name: &params.cluster_name,
            cluster_region: &params.cluster_region,
            project: &params.project,
            istio_version: &istio.version,
            profile: &istio.profile,
        }
    }
}

/// Runs istioctl from an extracted release
pub struct IstioInstaller<'a> {
    runner: &'a dyn CommandRunner,
    istioctl: PathBuf,
}

impl<'a> IstioInstaller<'a> {
    pub fn new(runner: &'a dyn CommandRunner, istioctl: PathBuf) -> Self {
        Self { runner, istioctl }
    }

    /// Render the operator descriptor template to `destination`
    pub async fn render_operator(
        renderer: &TemplateRenderer,
        template: &Path,
        destination: &Path,
        vars: &OperatorVars<'_>,
    ) -> Result<(), InstallError> {
        info!("Rendering operator descriptor {}", template.display());
        renderer.render_file(template, destination, vars).await
    }

    /// Install the control plane non-interactively
    pub async fn install(&self, profile: &str, operator: &Path) -> Result<(), InstallError> {
        info!("Installing Istio control plane (profile: {})...", profile);

        CommandBuilder::new(&self.istioctl)
            .args(["install", "--set"])
            .arg(format!("profile={}", profile))
            .arg("-f")
            .arg(operator)
            .arg("-y")
            .run_silent(self.runner)
            .await?;

        info!("Istio control plane installed");
        Ok(())
    }
}
