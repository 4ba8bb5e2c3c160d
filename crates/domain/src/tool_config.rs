//! Tool configuration, discovery sessions, and learned discovery patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Token,
    Basic,
    Oauth2,
    ApiKey,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Active,
    Inactive,
    Pending,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughMode {
    Required,
    Optional,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassthroughConfig {
    pub mode: PassthroughMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAuthType {
    Hmac,
    Bearer,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub auth_type: WebhookAuthType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_encrypted: Option<Vec<u8>>,
    /// Per-tool override of the server-wide dedup window default (§9).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup_window_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: f64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.1,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfiguration {
    pub id: String,
    pub tenant_id: String,
    pub tool_name: String,
    pub display_name: String,
    pub base_url: String,
    pub config: serde_json::Value,
    /// Opaque AEAD ciphertext; only `mcp-vault` can open it.
    pub credentials_encrypted: Vec<u8>,
    pub auth_type: AuthType,
    pub retry_policy: RetryPolicy,
    pub status: ToolStatus,
    pub health_status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_config: Option<WebhookConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough_config: Option<PassthroughConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Action name -> JSON Schema for its parameters, extracted at discovery.
    #[serde(default)]
    pub actions: std::collections::BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySessionStatus {
    Pending,
    Discovering,
    Discovered,
    Partial,
    Failed,
    Confirmed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDiscoverySession {
    pub session_id: String,
    pub tenant_id: String,
    pub base_url: String,
    pub status: DiscoverySessionStatus,
    pub discovered_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_url: Option<String>,
    #[serde(default)]
    pub discovery_metadata: serde_json::Value,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryPattern {
    pub domain: String,
    pub successful_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_format: Option<String>,
    pub success_count: u64,
    pub last_updated: DateTime<Utc>,
}

/// Fixed fallback probe paths used when no [`DiscoveryPattern`] exists yet
/// for a domain.
pub const FALLBACK_DISCOVERY_PATHS: &[&str] =
    &["/openapi.json", "/swagger.json", "/api-docs", "/v3/api-docs"];
