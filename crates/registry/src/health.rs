//! Tool health probing (§4.5 `HealthCheck`). A lightweight GET against the
//! tool's base URL; failures are recorded, never propagated to block
//! `ExecuteTool`.

use std::time::Duration;

use mcp_domain::tool_config::HealthStatus;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HealthChecker {
    http: reqwest::Client,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(PROBE_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Probes `base_url` and classifies the result. Never returns an `Err` —
    /// a probe failure is itself a health status, not a call failure.
    pub async fn probe(&self, base_url: &str) -> HealthStatus {
        match self.http.get(base_url).send().await {
            Ok(resp) if resp.status().is_success() => HealthStatus::Healthy,
            Ok(resp) if resp.status().is_server_error() => HealthStatus::Unhealthy,
            Ok(_) => HealthStatus::Degraded,
            Err(_) => HealthStatus::Unhealthy,
        }
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}
