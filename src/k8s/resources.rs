/// Applying manifests and kustomizations
use std::path::Path;
use tracing::info;

use crate::config::ManifestKind;
use crate::error::InstallError;
use crate::utils::command::{CommandBuilder, CommandRunner};

/// Generic Kubernetes resource management
pub struct ResourceManager<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> ResourceManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Apply a manifest file (`-f`) or kustomization directory (`-k`)
    pub async fn apply(&self, kind: ManifestKind, path: &Path) -> Result<(), InstallError> {
        info!("Applying {}", path.display());

        let flag = match kind {
            ManifestKind::File => "-f",
            ManifestKind::Kustomize => "-k",
        };

        let stdout = CommandBuilder::new("kubectl")
            .args(["apply", flag])
            .arg(path)
            .run(self.runner)
            .await?;

        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            info!("  {}", line.trim());
        }

        Ok(())
    }
}
