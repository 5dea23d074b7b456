/// Configuration management for the mesh installer
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an optional settings file
pub const CONFIG_ENV: &str = "MESH_INSTALLER_CONFIG";

/// Environment variable overriding the Istio version
pub const ISTIO_VERSION_ENV: &str = "ISTIO_VERSION";

/// Validated invocation parameters, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallParams {
    pub cluster_name: String,
    pub cluster_region: String,
    pub project: String,
}

/// Installer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Istio release and installation settings
    pub istio: IstioConfig,

    /// Directory the release archive is downloaded and extracted into
    pub work_dir: PathBuf,

    /// Services that must receive an external load balancer address
    pub load_balancers: Vec<LoadBalancerConfig>,

    /// Load balancer polling settings
    pub polling: PollingSettings,

    /// Pause before retrying a manifest marked `retry_once`
    pub retry_delay_secs: u64,

    /// Manifests applied after the mesh is installed, in order
    pub manifests: Vec<ManifestConfig>,
}

/// Istio release configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IstioConfig {
    /// Istio version (e.g., "1.8.2")
    pub version: String,

    /// Installation profile passed to istioctl
    pub profile: String,

    /// Release archive URL template ({{version}} and {{os}} are substituted)
    pub release_url: String,

    /// IstioOperator descriptor template
    pub operator_template: PathBuf,
}

/// A service exposed through a cloud load balancer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadBalancerConfig {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

/// A manifest or kustomization applied with kubectl
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestConfig {
    /// Name used in log output
    pub name: String,

    /// Path template ({{istio_dir}} and {{work_dir}} are substituted)
    pub path: String,

    #[serde(default)]
    pub kind: ManifestKind,

    /// Retry once after `retry_delay_secs` if the first apply fails
    #[serde(default)]
    pub retry_once: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// `kubectl apply -f`
    #[default]
    File,
    /// `kubectl apply -k`
    Kustomize,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            istio: IstioConfig::default(),
            work_dir: PathBuf::from("."),
            load_balancers: vec![
                LoadBalancerConfig {
                    namespace: "istio-system".to_string(),
                    name: "istio-ingressgateway".to_string(),
                },
                LoadBalancerConfig {
                    namespace: "istio-system".to_string(),
                    name: "istio-internal-ingressgateway".to_string(),
                },
            ],
            polling: PollingSettings::default(),
            retry_delay_secs: 15,
            manifests: vec![
                ManifestConfig {
                    name: "gateway".to_string(),
                    path: "manifests/gateway".to_string(),
                    kind: ManifestKind::Kustomize,
                    retry_once: false,
                },
                addon_manifest("prometheus", false),
                addon_manifest("grafana", false),
                // Kiali's custom resources race their CRDs on the first apply
                addon_manifest("kiali", true),
            ],
        }
    }
}

impl Default for IstioConfig {
    fn default() -> Self {
        Self {
            version: "1.8.2".to_string(),
            profile: "default".to_string(),
            release_url: "https://github.com/istio/istio/releases/download/{{version}}/istio-{{version}}-{{os}}.tar.gz".to_string(),
            operator_template: PathBuf::from("manifests/istio-operator.yaml"),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            interval_secs: 10,
        }
    }
}

fn addon_manifest(name: &str, retry_once: bool) -> ManifestConfig {
    ManifestConfig {
        name: name.to_string(),
        path: format!("{{{{istio_dir}}}}/samples/addons/{}.yaml", name),
        kind: ManifestKind::File,
        retry_once,
    }
}

impl InstallerConfig {
    /// Load settings from `MESH_INSTALLER_CONFIG` if set, defaults otherwise
    pub fn load() -> anyhow::Result<Self> {
        let config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(&path)
                .with_context(|| format!("Failed to load {}", Path::new(&path).display()))?,
            None => Self::default(),
        };

        let config = config.with_version_override(std::env::var(ISTIO_VERSION_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: InstallerConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply an `ISTIO_VERSION`-style override
    pub fn with_version_override(mut self, version: Option<String>) -> Self {
        if let Some(version) = version.filter(|v| !v.trim().is_empty()) {
            self.istio.version = version.trim().to_string();
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.istio.version.is_empty() {
            anyhow::bail!("istio.version cannot be empty");
        }

        if self.istio.profile.is_empty() {
            anyhow::bail!("istio.profile cannot be empty");
        }

        if self.manifests.is_empty() {
            anyhow::bail!("at least one manifest is required");
        }

        if self.polling.interval_secs == 0 {
            anyhow::bail!("polling.interval_secs must be greater than zero");
        }

        Ok(())
    }

    /// Directory the release archive extracts to
    pub fn istio_dir(&self) -> PathBuf {
        self.work_dir.join(format!("istio-{}", self.istio.version))
    }

    /// File name of the release archive for a platform suffix
    pub fn archive_name(&self, release_os: &str) -> String {
        format!("istio-{}-{}.tar.gz", self.istio.version, release_os)
    }

    /// Path of the istioctl binary inside the extracted release
    pub fn istioctl_path(&self) -> PathBuf {
        self.istio_dir().join("bin").join("istioctl")
    }

    /// Where the rendered operator descriptor is written
    pub fn rendered_operator_path(&self) -> PathBuf {
        self.work_dir.join("istio-operator.rendered.yaml")
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstallerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.load_balancers.len(), 2);

        let names: Vec<_> = config.manifests.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["gateway", "prometheus", "grafana", "kiali"]);

        let retried: Vec<_> = config
            .manifests
            .iter()
            .filter(|m| m.retry_once)
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(retried, ["kiali"]);
        assert_eq!(
            config.manifests[1].path,
            "{{istio_dir}}/samples/addons/prometheus.yaml"
        );
    }

    #[test]
    fn test_derived_paths() {
        let config = InstallerConfig {
            work_dir: PathBuf::from("/tmp/mesh"),
            ..Default::default()
        };

        assert_eq!(config.istio_dir(), PathBuf::from("/tmp/mesh/istio-1.8.2"));
        assert_eq!(
            config.istioctl_path(),
            PathBuf::from("/tmp/mesh/istio-1.8.2/bin/istioctl")
        );
        assert_eq!(
            config.archive_name("osx"),
            "istio-1.8.2-osx.tar.gz".to_string()
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = InstallerConfig::from_yaml(
            r#"
istio:
  version: "1.9.0"
retry_delay_secs: 30
manifests:
  - name: gateway
    path: deploy/gateway
    kind: kustomize
  - name: kiali
    path: "{{istio_dir}}/samples/addons/kiali.yaml"
    retry_once: true
"#,
        )
        .unwrap();

        assert_eq!(config.istio.version, "1.9.0");
        assert_eq!(config.istio.profile, "default");
        assert_eq!(config.retry_delay(), Duration::from_secs(30));
        assert_eq!(config.polling.timeout_secs, 600);
        assert_eq!(config.manifests[0].kind, ManifestKind::Kustomize);
        assert_eq!(config.manifests[1].kind, ManifestKind::File);
        assert!(config.manifests[1].retry_once);
    }

    #[test]
    fn test_config_validation() {
        let mut config = InstallerConfig::default();
        config.manifests.clear();
        assert!(config.validate().is_err());

        let mut config = InstallerConfig::default();
        config.polling.interval_secs = 0;
        assert!(config.validate().is_err());

        assert!(InstallerConfig::from_yaml("istio:\n  profile: \"\"\n").is_err());
    }

    #[test]
    fn test_version_override() {
        let config = InstallerConfig::default().with_version_override(Some("1.10.0".to_string()));
        assert_eq!(config.istio.version, "1.10.0");

        let config = InstallerConfig::default().with_version_override(Some("  ".to_string()));
        assert_eq!(config.istio.version, "1.8.2");

        let config = InstallerConfig::default().with_version_override(None);
        assert_eq!(config.istio.version, "1.8.2");
    }
}
