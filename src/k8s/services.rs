/// Waiting for load balancer services to get an external address
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::LoadBalancerConfig;
use crate::error::InstallError;
use crate::utils::command::{CommandBuilder, CommandRunner};
use crate::utils::polling::PollingConfig;

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(default)]
    status: ServiceStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceStatus {
    #[serde(default)]
    load_balancer: LoadBalancerStatus,
}

#[derive(Debug, Default, Deserialize)]
struct LoadBalancerStatus {
    #[serde(default)]
    ingress: Vec<LoadBalancerIngress>,
}

#[derive(Debug, Deserialize)]
struct LoadBalancerIngress {
    ip: Option<String>,
    hostname: Option<String>,
}

/// Extract the first external address from `kubectl get service -o json` output
pub fn external_address(service_json: &str) -> Result<Option<String>, InstallError> {
    let service: Service = serde_json::from_str(service_json)?;
    Ok(service
        .status
        .load_balancer
        .ingress
        .into_iter()
        .find_map(|ingress| ingress.ip.or(ingress.hostname))
        .filter(|address| !address.is_empty()))
}

pub struct ServiceManager<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> ServiceManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Current external address, or None while pending or not yet created
    async fn current_address(
        &self,
        service: &LoadBalancerConfig,
    ) -> Result<Option<String>, InstallError> {
        let output = CommandBuilder::new("kubectl")
            .args([
                "get",
                "service",
                service.name.as_str(),
                "-n",
                service.namespace.as_str(),
                "-o",
                "json",
            ])
            .output(self.runner)
            .await?;

        if !output.success {
            debug!(
                "Service {}/{} not available yet: {}",
                service.namespace,
                service.name,
                output.stderr.trim()
            );
            return Ok(None);
        }

        external_address(&output.stdout)
    }

    /// Poll until the service has an external load balancer address
    pub async fn wait_for_external_ip(
        &self,
        service: &LoadBalancerConfig,
        polling: &PollingConfig,
    ) -> Result<String, InstallError> {
        let address = polling.poll(|| self.current_address(service)).await?;
        info!(
            "Service {}/{} is reachable at {}",
            service.namespace, service.name, address
        );
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command::fake::{service_json, FakeRunner};
    use std::time::Duration;

    fn ingress_gateway() -> LoadBalancerConfig {
        LoadBalancerConfig {
            namespace: "istio-system".to_string(),
            name: "istio-ingressgateway".to_string(),
        }
    }

    fn fast_polling() -> PollingConfig {
        PollingConfig::new(
            Duration::from_secs(5),
            Duration::from_millis(1),
            "Waiting for load balancer",
        )
    }

    #[test]
    fn test_external_address() {
        assert_eq!(
            external_address(&service_json(Some("198.51.100.4"))).unwrap(),
            Some("198.51.100.4".to_string())
        );
        assert_eq!(external_address(&service_json(None)).unwrap(), None);
        assert_eq!(external_address(r#"{"spec": {}}"#).unwrap(), None);
        assert_eq!(
            external_address(
                r#"{"status": {"loadBalancer": {"ingress": [{"hostname": "lb.example.com"}]}}}"#
            )
            .unwrap(),
            Some("lb.example.com".to_string())
        );
        assert!(external_address("not json").is_err());
    }

    #[tokio::test]
    async fn test_waits_through_pending_and_missing_service() {
        let pending = service_json(None);
        let ready = service_json(Some("198.51.100.4"));
        let runner = FakeRunner::new()
            .fail("get service istio-ingressgateway", 1, 1)
            .respond("get service istio-ingressgateway", &[pending.as_str(), ready.as_str()]);

        let address = ServiceManager::new(&runner)
            .wait_for_external_ip(&ingress_gateway(), &fast_polling())
            .await
            .unwrap();

        assert_eq!(address, "198.51.100.4");
        assert_eq!(runner.count("get service istio-ingressgateway"), 3);
        assert_eq!(
            runner.calls()[0],
            "kubectl get service istio-ingressgateway -n istio-system -o json"
        );
    }

    #[tokio::test]
    async fn test_times_out_without_address() {
        let pending = service_json(None);
        let runner = FakeRunner::new().respond("get service", &[pending.as_str()]);
        let polling = PollingConfig::new(
            Duration::from_millis(20),
            Duration::from_millis(5),
            "Waiting for load balancer",
        );

        let err = ServiceManager::new(&runner)
            .wait_for_external_ip(&ingress_gateway(), &polling)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Timeout { .. }));
    }
}
