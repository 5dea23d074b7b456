/// Installation sequence: project, release, credentials, mesh, load balancers, manifests
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{InstallParams, InstallerConfig, ManifestConfig};
use crate::error::InstallError;
use crate::gcloud::GcloudClient;
use crate::istio::{IstioInstaller, IstioRelease, OperatorVars};
use crate::k8s::{ResourceManager, ServiceManager};
use crate::platform::Platform;
use crate::utils::command::CommandRunner;
use crate::utils::polling::PollingConfig;
use crate::utils::template::TemplateRenderer;

const STEPS: usize = 6;

#[derive(Serialize)]
struct PathVars {
    istio_dir: String,
    work_dir: String,
}

/// Runs every installation step in order, stopping at the first failure
pub struct Installer<'a> {
    runner: &'a dyn CommandRunner,
    params: InstallParams,
    config: InstallerConfig,
    platform: Platform,
    renderer: TemplateRenderer,
}

impl<'a> Installer<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        params: InstallParams,
        config: InstallerConfig,
        platform: Platform,
    ) -> Self {
        Self {
            runner,
            params,
            config,
            platform,
            renderer: TemplateRenderer::new(),
        }
    }

    pub async fn run(&self) -> Result<(), InstallError> {
        info!(
            "Installing Istio {} on cluster {} ({}, project {})",
            self.config.istio.version,
            self.params.cluster_name,
            self.params.cluster_region,
            self.params.project
        );

        let gcloud = GcloudClient::new(self.runner);

        step(1, "Setting active project");
        gcloud.set_project(&self.params.project).await?;

        step(2, "Fetching Istio release");
        let release = IstioRelease::resolve(&self.config, self.platform, &self.renderer)?;
        release.ensure(self.runner).await?;

        step(3, "Fetching cluster credentials");
        gcloud.get_credentials(&self.params).await?;

        step(4, "Installing the mesh control plane");
        self.install_mesh().await?;

        step(5, "Waiting for load balancers");
        self.wait_for_load_balancers().await?;

        step(6, "Applying manifests");
        self.apply_manifests().await?;

        info!("✓ Istio installation completed successfully!");
        Ok(())
    }

    async fn install_mesh(&self) -> Result<(), InstallError> {
        let operator = self.config.rendered_operator_path();
        IstioInstaller::render_operator(
            &self.renderer,
            &self.config.istio.operator_template,
            &operator,
            &OperatorVars::new(&self.params, &self.config.istio),
        )
        .await?;

        IstioInstaller::new(self.runner, self.config.istioctl_path())
            .install(&self.config.istio.profile, &operator)
            .await
    }

    async fn wait_for_load_balancers(&self) -> Result<(), InstallError> {
        let services = ServiceManager::new(self.runner);

        for lb in &self.config.load_balancers {
            let polling = PollingConfig::new(
                self.config.poll_timeout(),
                self.config.poll_interval(),
                format!(
                    "Waiting for external IP on {}/{}",
                    lb.namespace, lb.name
                ),
            );
            services.wait_for_external_ip(lb, &polling).await?;
        }

        Ok(())
    }

    async fn apply_manifests(&self) -> Result<(), InstallError> {
        for manifest in &self.config.manifests {
            self.apply_manifest(manifest).await?;
        }
        Ok(())
    }

    /// Apply one manifest; `retry_once` manifests get a single second attempt
    async fn apply_manifest(&self, manifest: &ManifestConfig) -> Result<(), InstallError> {
        let path = self.manifest_path(manifest)?;
        let resources = ResourceManager::new(self.runner);

        info!("Applying {} manifest", manifest.name);
        match resources.apply(manifest.kind, &path).await {
            Ok(()) => Ok(()),
            Err(e) if manifest.retry_once => {
                warn!(
                    "Applying {} failed, retrying in {}s: {}",
                    manifest.name, self.config.retry_delay_secs, e
                );
                tokio::time::sleep(self.config.retry_delay()).await;
                resources.apply(manifest.kind, &path).await
            }
            Err(e) => Err(e),
        }
    }

    fn manifest_path(&self, manifest: &ManifestConfig) -> Result<PathBuf, InstallError> {
        let vars = PathVars {
            istio_dir: self.config.istio_dir().display().to_string(),
            work_dir: self.config.work_dir.display().to_string(),
        };
        Ok(PathBuf::from(self.renderer.render(&manifest.path, &vars)?))
    }
}

fn step(number: usize, description: &str) {
    info!("[{}/{}] {}", number, STEPS, description);
}
