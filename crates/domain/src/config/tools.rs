use serde::{Deserialize, Serialize};

use crate::tool_config::RetryPolicy;

/// Tool registry / executor defaults (§4.5, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub default_retry_policy: RetryPolicy,
    /// Consecutive failures before the per-(tenant, tool) circuit breaker opens.
    #[serde(default = "d_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    /// Cooldown before a half-open probe is allowed.
    #[serde(default = "d_breaker_cooldown")]
    pub circuit_breaker_cooldown_secs: u64,
    /// Global timeout for an OpenAPI discovery session.
    #[serde(default = "d_discovery_timeout")]
    pub discovery_timeout_secs: u64,
    /// Bounded concurrency for discovery probes.
    #[serde(default = "d_discovery_concurrency")]
    pub discovery_concurrency: usize,
    /// Default parallel-batch concurrency (per tenant override possible at
    /// the call site, this is just the server-wide default).
    #[serde(default = "d_batch_concurrency")]
    pub default_batch_concurrency: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_retry_policy: RetryPolicy::default(),
            circuit_breaker_threshold: d_breaker_threshold(),
            circuit_breaker_cooldown_secs: d_breaker_cooldown(),
            discovery_timeout_secs: d_discovery_timeout(),
            discovery_concurrency: d_discovery_concurrency(),
            default_batch_concurrency: d_batch_concurrency(),
        }
    }
}

fn d_breaker_threshold() -> u32 {
    5
}
fn d_breaker_cooldown() -> u64 {
    30
}
fn d_discovery_timeout() -> u64 {
    30
}
fn d_discovery_concurrency() -> usize {
    4
}
fn d_batch_concurrency() -> usize {
    8
}
