//! Dynamic Tool Registry (§4.5): discovery-then-confirm lifecycle for
//! per-tenant tool configurations, plus standard CRUD and health probing.
//!
//! Grounded on two register-or-record idioms from this repo: the
//! `HashMap<id, T>` registry with a skip-on-error `from_config` loop (tool
//! discovery probes the same way — a failed candidate is recorded, not
//! fatal), and the register-then-report-errors pattern that keeps
//! partial-failure state visible rather than aborting the whole operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use mcp_domain::error::{CoreError, Result};
use mcp_domain::tool_config::{
    AuthType, DiscoveryPattern, DiscoverySessionStatus, HealthStatus, PassthroughConfig,
    RetryPolicy, ToolConfiguration, ToolDiscoverySession, ToolStatus, WebhookConfig,
};
use mcp_store::TenantScopedStore;
use mcp_vault::Vault;
use serde_json::Value;

use crate::discovery::Discoverer;
use crate::health::HealthChecker;
use crate::openapi;

const DISCOVERY_SESSION_TTL_SECS: i64 = 15 * 60;

pub struct DiscoverToolRequest {
    pub base_url: String,
}

/// The operator's choice among a session's `discovered_urls`, plus the
/// fields needed to materialize the `ToolConfiguration`.
pub struct ConfirmToolSelection {
    pub selected_url: String,
    pub tool_name: String,
    pub display_name: String,
    pub auth_type: AuthType,
    /// Raw credential material (tokens, client secret, etc). Encrypted
    /// before it ever reaches the store.
    pub credentials: Value,
    pub retry_policy: Option<RetryPolicy>,
    pub webhook_config: Option<WebhookConfig>,
    pub passthrough_config: Option<PassthroughConfig>,
    pub provider: Option<String>,
}

#[derive(Default)]
pub struct ToolFilter {
    pub status: Option<ToolStatus>,
}

#[derive(Default)]
pub struct UpdateToolRequest {
    pub display_name: Option<String>,
    pub config: Option<Value>,
    pub credentials: Option<Value>,
    pub retry_policy: Option<RetryPolicy>,
    pub status: Option<ToolStatus>,
    pub webhook_config: Option<WebhookConfig>,
    pub passthrough_config: Option<PassthroughConfig>,
}

pub struct ToolRegistry {
    store: TenantScopedStore,
    vault: Arc<Vault>,
    discoverer: Discoverer,
    health: HealthChecker,
}

fn domain_of(base_url: &str) -> Option<String> {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

impl ToolRegistry {
    pub fn new(store: TenantScopedStore, vault: Arc<Vault>) -> Self {
        Self {
            store,
            vault,
            discoverer: Discoverer::new(),
            health: HealthChecker::new(),
        }
    }

    pub async fn discover_tool(&self, req: DiscoverToolRequest) -> Result<ToolDiscoverySession> {
        if req.base_url.trim().is_empty() {
            return Err(CoreError::InvalidArgument("base_url is required".into()));
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let mut session = ToolDiscoverySession {
            session_id: session_id.clone(),
            tenant_id: self.store.tenant_id().to_string(),
            base_url: req.base_url.clone(),
            status: DiscoverySessionStatus::Pending,
            discovered_urls: Vec::new(),
            selected_url: None,
            discovery_metadata: Value::Null,
            expires_at: Utc::now() + chrono::Duration::seconds(DISCOVERY_SESSION_TTL_SECS),
        };
        self.store.insert_discovery_session(session.clone())?;

        session.status = DiscoverySessionStatus::Discovering;
        self.store.update_discovery_session(session.clone())?;

        let pattern = domain_of(&req.base_url)
            .and_then(|domain| self.store.get_discovery_pattern(&domain).ok().flatten());

        let outcome = self.discoverer.discover(&req.base_url, pattern.as_ref()).await;

        session.status = outcome.status;
        session.discovered_urls = outcome.discovered_urls;
        self.store.update_discovery_session(session.clone())?;

        if session.status == DiscoverySessionStatus::Failed {
            tracing::warn!(base_url = %req.base_url, "tool discovery found no candidate OpenAPI document");
        }

        Ok(session)
    }

    pub async fn confirm_tool(
        &self,
        session_id: &str,
        selection: ConfirmToolSelection,
    ) -> Result<ToolConfiguration> {
        let mut session = self.store.get_discovery_session(session_id)?;
        if !session.discovered_urls.iter().any(|u| u == &selection.selected_url) {
            return Err(CoreError::InvalidArgument(format!(
                "{} was not among the discovered candidates for this session",
                selection.selected_url
            )));
        }
        if selection.tool_name.trim().is_empty() {
            return Err(CoreError::InvalidArgument("tool_name is required".into()));
        }

        let spec = self
            .http_get_json(&selection.selected_url)
            .await
            .map_err(|e| CoreError::Unavailable(format!("failed to fetch OpenAPI document: {e}")))?;
        let actions = openapi::extract_actions(&spec)?;

        let credentials_bytes = serde_json::to_vec(&selection.credentials)?;
        let credentials_encrypted = self
            .vault
            .encrypt(self.store.tenant_id(), &credentials_bytes);

        let now = Utc::now();
        let tool = ToolConfiguration {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: self.store.tenant_id().to_string(),
            tool_name: selection.tool_name,
            display_name: selection.display_name,
            base_url: session.base_url.clone(),
            config: Value::Object(Default::default()),
            credentials_encrypted,
            auth_type: selection.auth_type,
            retry_policy: selection.retry_policy.unwrap_or_default(),
            status: ToolStatus::Active,
            health_status: HealthStatus::Unknown,
            last_health_check: None,
            webhook_config: selection.webhook_config,
            passthrough_config: selection.passthrough_config,
            provider: selection.provider,
            actions,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_tool_config(tool.clone())?;

        session.status = DiscoverySessionStatus::Confirmed;
        session.selected_url = Some(selection.selected_url.clone());
        self.store.update_discovery_session(session.clone())?;

        if let Some(domain) = domain_of(&session.base_url) {
            self.record_discovery_pattern(&domain, &selection.selected_url)?;
        }

        Ok(tool)
    }

    fn record_discovery_pattern(&self, domain: &str, confirmed_path: &str) -> Result<()> {
        let path = reqwest::Url::parse(confirmed_path)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| confirmed_path.to_string());

        let mut pattern = self
            .store
            .get_discovery_pattern(domain)?
            .unwrap_or_else(|| DiscoveryPattern {
                domain: domain.to_string(),
                successful_paths: Vec::new(),
                auth_method: None,
                api_format: None,
                success_count: 0,
                last_updated: Utc::now(),
            });

        if !pattern.successful_paths.iter().any(|p| p == &path) {
            pattern.successful_paths.insert(0, path);
        }
        pattern.success_count += 1;
        pattern.last_updated = Utc::now();
        self.store.upsert_discovery_pattern(pattern)
    }

    async fn http_get_json(&self, url: &str) -> std::result::Result<Value, reqwest::Error> {
        reqwest::get(url).await?.json::<Value>().await
    }

    pub fn list_tools(&self, filter: ToolFilter) -> Result<Vec<ToolConfiguration>> {
        let mut tools = self.store.list_tool_configs()?;
        if let Some(status) = filter.status {
            tools.retain(|t| t.status == status);
        }
        Ok(tools)
    }

    pub fn get_tool(&self, tool_id: &str) -> Result<ToolConfiguration> {
        self.store.get_tool_config(tool_id)
    }

    pub fn update_tool(&self, tool_id: &str, update: UpdateToolRequest) -> Result<ToolConfiguration> {
        let mut tool = self.store.get_tool_config(tool_id)?;

        if let Some(display_name) = update.display_name {
            tool.display_name = display_name;
        }
        if let Some(config) = update.config {
            tool.config = config;
        }
        if let Some(credentials) = update.credentials {
            let bytes = serde_json::to_vec(&credentials)?;
            tool.credentials_encrypted = self.vault.encrypt(self.store.tenant_id(), &bytes);
        }
        if let Some(retry_policy) = update.retry_policy {
            tool.retry_policy = retry_policy;
        }
        if let Some(status) = update.status {
            tool.status = status;
        }
        if update.webhook_config.is_some() {
            tool.webhook_config = update.webhook_config;
        }
        if update.passthrough_config.is_some() {
            tool.passthrough_config = update.passthrough_config;
        }
        tool.updated_at = Utc::now();

        self.store.update_tool_config(tool.clone())?;
        Ok(tool)
    }

    /// Hard-deletes the tool and cascades to its execution audit trail.
    /// Callers wanting to preserve history should prefer
    /// `update_tool(id, UpdateToolRequest { status: Some(ToolStatus::Inactive), .. })`.
    pub fn delete_tool(&self, tool_id: &str) -> Result<bool> {
        self.store.delete_tool_config(tool_id)
    }

    /// Never returns an error — a probe failure is recorded as
    /// `HealthStatus::Unhealthy`, it never blocks `ExecuteTool`.
    pub async fn health_check(&self, tool_id: &str) -> Result<ToolConfiguration> {
        let mut tool = self.store.get_tool_config(tool_id)?;
        let status = self.health.probe(&tool.base_url).await;
        tracing::info!(tool_id, base_url = %tool.base_url, health_status = ?status, "tool health check");

        tool.health_status = status;
        tool.last_health_check = Some(Utc::now());
        self.store.update_tool_config(tool.clone())?;
        Ok(tool)
    }

    pub fn decrypt_credentials(&self, tool: &ToolConfiguration) -> Result<Value> {
        let bytes = self
            .vault
            .decrypt(self.store.tenant_id(), &tool.credentials_encrypted)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Actions discoverable from a confirmed tool, surfaced separately from the
/// raw `ToolConfiguration` for `GetTool` callers that only need schemas.
pub fn action_schemas(tool: &ToolConfiguration) -> &BTreeMap<String, Value> {
    &tool.actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_store::{InMemoryCache, InMemoryObjectStore, InMemoryStore};
    use std::sync::Arc as StdArc;

    fn registry() -> ToolRegistry {
        let store = TenantScopedStore::new(
            StdArc::new(InMemoryStore::new()),
            StdArc::new(InMemoryObjectStore::new()),
            StdArc::new(InMemoryCache::new()),
            "tenant-a",
        );
        let vault = Arc::new(Vault::new(b"test-master-secret".to_vec(), 1));
        ToolRegistry::new(store, vault)
    }

    #[tokio::test]
    async fn discover_tool_requires_base_url() {
        let registry = registry();
        let err = registry
            .discover_tool(DiscoverToolRequest { base_url: "".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn confirm_tool_rejects_url_outside_discovered_set() {
        let registry = registry();
        let session = registry
            .discover_tool(DiscoverToolRequest {
                base_url: "http://127.0.0.1:1".into(),
            })
            .await
            .unwrap();

        let err = registry
            .confirm_tool(
                &session.session_id,
                ConfirmToolSelection {
                    selected_url: "http://evil.example/spec.json".into(),
                    tool_name: "x".into(),
                    display_name: "X".into(),
                    auth_type: AuthType::Token,
                    credentials: serde_json::json!({}),
                    retry_policy: None,
                    webhook_config: None,
                    passthrough_config: None,
                    provider: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::InvalidArgument);
    }

    #[test]
    fn delete_tool_is_idempotent_for_unknown_id() {
        let registry = registry();
        assert!(!registry.delete_tool("does-not-exist").unwrap());
    }
}
