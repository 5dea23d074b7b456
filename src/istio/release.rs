/// Istio release download and extraction
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::InstallerConfig;
use crate::error::InstallError;
use crate::platform::Platform;
use crate::utils::command::{CommandBuilder, CommandRunner};
use crate::utils::template::TemplateRenderer;

#[derive(Serialize)]
struct ReleaseVars<'a> {
    version: &'a str,
    os: &'a str,
}

/// Locations of one Istio release on the local filesystem
pub struct IstioRelease {
    pub url: String,
    pub archive: PathBuf,
    pub dir: PathBuf,
    work_dir: PathBuf,
}

impl IstioRelease {
    pub fn resolve(
        config: &InstallerConfig,
        platform: Platform,
        renderer: &TemplateRenderer,
    ) -> Result<Self, InstallError> {
        let os = platform.release_os();
        let url = renderer.render(
            &config.istio.release_url,
            &ReleaseVars {
                version: &config.istio.version,
                os,
            },
        )?;

        Ok(Self {
            url,
            archive: config.work_dir.join(config.archive_name(os)),
            dir: config.istio_dir(),
            work_dir: config.work_dir.clone(),
        })
    }

    /// Download and unpack the release unless it is already extracted.
    /// Returns whether anything was fetched.
    pub async fn ensure(&self, runner: &dyn CommandRunner) -> Result<bool, InstallError> {
        if self.dir.exists() {
            info!(
                "Istio release already present at {}, skipping download",
                self.dir.display()
            );
            return Ok(false);
        }

        tokio::fs::create_dir_all(&self.work_dir).await?;

        info!("Downloading {}", self.url);
        CommandBuilder::new("wget")
            .args(["-q", self.url.as_str(), "-O"])
            .arg(&self.archive)
            .run_silent(runner)
            .await?;

        info!("Extracting {}", self.archive.display());
        CommandBuilder::new("tar")
            .arg("-xzf")
            .arg(self.archive.file_name().unwrap_or(self.archive.as_os_str()))
            .current_dir(&self.work_dir)
            .run_silent(runner)
            .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command::fake::FakeRunner;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("mesh-installer-release-{}", rand::random::<u64>()))
    }

    #[test]
    fn test_resolve_release_paths() {
        let config = InstallerConfig {
            work_dir: PathBuf::from("/opt/mesh"),
            ..Default::default()
        };
        let release =
            IstioRelease::resolve(&config, Platform::Darwin, &TemplateRenderer::new()).unwrap();

        assert_eq!(
            release.url,
            "https://github.com/istio/istio/releases/download/1.8.2/istio-1.8.2-osx.tar.gz"
        );
        assert_eq!(
            release.archive,
            PathBuf::from("/opt/mesh/istio-1.8.2-osx.tar.gz")
        );
        assert_eq!(release.dir, PathBuf::from("/opt/mesh/istio-1.8.2"));
    }

    #[tokio::test]
    async fn test_downloads_when_missing() {
        let work_dir = scratch_dir();
        let config = InstallerConfig {
            work_dir: work_dir.clone(),
            ..Default::default()
        };
        let release =
            IstioRelease::resolve(&config, Platform::Linux, &TemplateRenderer::new()).unwrap();
        let runner = FakeRunner::new();

        assert!(release.ensure(&runner).await.unwrap());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("wget -q https://github.com/istio/istio/releases/download/1.8.2/"));
        assert!(calls[0].ends_with("istio-1.8.2-linux-amd64.tar.gz"));
        assert_eq!(calls[1], "tar -xzf istio-1.8.2-linux-amd64.tar.gz");
        assert_eq!(
            runner.invocations()[1].current_dir.as_deref(),
            Some(work_dir.as_path())
        );

        std::fs::remove_dir_all(&work_dir).ok();
    }

    #[tokio::test]
    async fn test_skips_existing_release() {
        let work_dir = scratch_dir();
        let config = InstallerConfig {
            work_dir: work_dir.clone(),
            ..Default::default()
        };
        std::fs::create_dir_all(config.istio_dir()).unwrap();

        let release =
            IstioRelease::resolve(&config, Platform::Linux, &TemplateRenderer::new()).unwrap();
        let runner = FakeRunner::new();

        assert!(!release.ensure(&runner).await.unwrap());
        assert!(runner.calls().is_empty());

        std::fs::remove_dir_all(&work_dir).ok();
    }

    #[tokio::test]
    async fn test_failed_download_stops_before_extract() {
        let work_dir = scratch_dir();
        let config = InstallerConfig {
            work_dir: work_dir.clone(),
            ..Default::default()
        };
        let release =
            IstioRelease::resolve(&config, Platform::Linux, &TemplateRenderer::new()).unwrap();
        let runner = FakeRunner::new().fail("wget", 1, 8);

        let err = release.ensure(&runner).await.unwrap_err();
        assert_eq!(err.exit_code(), 8);
        assert_eq!(runner.count("tar -xzf"), 0);

        std::fs::remove_dir_all(&work_dir).ok();
    }
}
