//! Storage contracts (§5, §6). The in-process reference implementation in
//! [`crate::memory`] is the only implementation today; a real backend would
//! implement the same traits so the facade above it never changes.

use mcp_domain::context::Context;
use mcp_domain::error::Result;
use mcp_domain::principal::ApiKey;
use mcp_domain::tool_config::{DiscoveryPattern, ToolConfiguration, ToolDiscoverySession};
use mcp_domain::webhook::WebhookEvent;
use mcp_domain::execution::{ExecutionRetry, ToolExecution};

/// The relational surface: contexts, tool configuration, discovery,
/// execution audit trail, webhooks, and API keys. Every method except the
/// global `discovery_patterns_*` pair takes or is scoped by `tenant_id` —
/// the trait itself does not enforce isolation, [`crate::facade::TenantScopedStore`] does.
pub trait RelationalStore: Send + Sync {
    fn insert_context(&self, ctx: Context) -> Result<()>;
    fn get_context(&self, tenant_id: &str, id: &str) -> Result<Option<Context>>;
    fn update_context(&self, ctx: Context) -> Result<()>;
    fn delete_context(&self, tenant_id: &str, id: &str) -> Result<bool>;
    fn list_contexts(&self, tenant_id: &str, agent_id: Option<&str>) -> Result<Vec<Context>>;
    fn search_contexts(&self, tenant_id: &str, query: &str) -> Result<Vec<Context>>;

    fn insert_tool_config(&self, tool: ToolConfiguration) -> Result<()>;
    fn get_tool_config(&self, tenant_id: &str, id: &str) -> Result<Option<ToolConfiguration>>;
    fn get_tool_config_by_name(
        &self,
        tenant_id: &str,
        tool_name: &str,
    ) -> Result<Option<ToolConfiguration>>;
    fn update_tool_config(&self, tool: ToolConfiguration) -> Result<()>;
    fn delete_tool_config(&self, tenant_id: &str, id: &str) -> Result<bool>;
    fn list_tool_configs(&self, tenant_id: &str) -> Result<Vec<ToolConfiguration>>;

    fn insert_discovery_session(&self, session: ToolDiscoverySession) -> Result<()>;
    fn get_discovery_session(
        &self,
        tenant_id: &str,
        session_id: &str,
    ) -> Result<Option<ToolDiscoverySession>>;
    fn update_discovery_session(&self, session: ToolDiscoverySession) -> Result<()>;

    fn upsert_discovery_pattern(&self, pattern: DiscoveryPattern) -> Result<()>;
    fn get_discovery_pattern(&self, domain: &str) -> Result<Option<DiscoveryPattern>>;

    fn insert_execution(&self, exec: ToolExecution) -> Result<()>;
    fn update_execution(&self, exec: ToolExecution) -> Result<()>;
    fn get_execution(&self, tenant_id: &str, id: &str) -> Result<Option<ToolExecution>>;
    fn list_executions(&self, tenant_id: &str, tool_config_id: &str) -> Result<Vec<ToolExecution>>;
    fn insert_execution_retry(&self, retry: ExecutionRetry) -> Result<()>;
    fn list_execution_retries(&self, execution_id: &str) -> Result<Vec<ExecutionRetry>>;
    /// Removes every execution (and its retries) recorded against a tool
    /// config, for the hard-delete cascade. Returns the number removed.
    fn delete_executions_for_tool(&self, tenant_id: &str, tool_config_id: &str) -> Result<u64>;

    fn insert_webhook_event(&self, event: WebhookEvent) -> Result<()>;
    fn update_webhook_event(&self, event: WebhookEvent) -> Result<()>;
    fn get_webhook_event(&self, tenant_id: &str, id: &str) -> Result<Option<WebhookEvent>>;

    fn insert_api_key(&self, key: ApiKey) -> Result<()>;
    fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>>;
    fn get_api_key_by_hashed_secret(&self, hashed_secret: &[u8]) -> Result<Option<ApiKey>>;
    fn list_api_keys(&self, tenant_id: &str) -> Result<Vec<ApiKey>>;
}

/// Blob storage for large context content offloaded past [`mcp_domain::context::LARGE_THRESHOLD`]
/// and for cached OpenAPI documents fetched during discovery.
pub trait ObjectStore: Send + Sync {
    fn put(&self, tenant_id: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
    fn get(&self, tenant_id: &str, key: &str) -> Result<Option<Vec<u8>>>;
    fn delete(&self, tenant_id: &str, key: &str) -> Result<bool>;
}

/// Read-through/write-through cache in front of the relational store for hot
/// reads (context fetch, tool config fetch). Entries expire after a TTL set
/// by the caller at `put` time.
pub trait Cache: Send + Sync {
    fn put(&self, key: &str, value: serde_json::Value, ttl_secs: u64);
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    fn invalidate(&self, key: &str);
}
