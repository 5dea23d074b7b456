/// Polling utilities for waiting on conditions with timeout
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::info;

use crate::error::InstallError;

/// Configuration for polling operations
pub struct PollingConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub description: String,
}

impl PollingConfig {
    pub fn new(timeout: Duration, interval: Duration, description: impl Into<String>) -> Self {
        Self {
            timeout,
            interval,
            description: description.into(),
        }
    }

    /// Poll until condition is met or timeout
    ///
    /// The condition function should return:
    /// - Ok(Some(T)) when condition is met (returns T)
    /// - Ok(None) when condition is not yet met (continues polling)
    /// - Err(e) when an error occurs (stops polling and returns error)
    pub async fn poll<F, Fut, T>(&self, condition: F) -> Result<T, InstallError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<T>, InstallError>>,
    {
        info!("{}...", self.description);

        let start = Instant::now();

        loop {
            if let Some(value) = condition().await? {
                info!("✓ {}", self.description);
                return Ok(value);
            }

            if start.elapsed() > self.timeout {
                return Err(InstallError::Timeout {
                    description: self.description.clone(),
                    secs: self.timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
