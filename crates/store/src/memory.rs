//! In-process reference store: `RwLock`-guarded maps keyed by entity id,
//! mirroring this repo's existing registry idiom (one `RwLock<HashMap<...>>`
//! per entity, read for lookups, write for mutation).

use std::collections::HashMap;

use parking_lot::RwLock;

use mcp_domain::context::Context;
use mcp_domain::error::{CoreError, Result};
use mcp_domain::execution::{ExecutionRetry, ToolExecution};
use mcp_domain::principal::ApiKey;
use mcp_domain::tool_config::{DiscoveryPattern, ToolConfiguration, ToolDiscoverySession};
use mcp_domain::webhook::WebhookEvent;

use crate::traits::{Cache, ObjectStore, RelationalStore};

#[derive(Default)]
pub struct InMemoryStore {
    contexts: RwLock<HashMap<String, Context>>,
    tool_configs: RwLock<HashMap<String, ToolConfiguration>>,
    discovery_sessions: RwLock<HashMap<String, ToolDiscoverySession>>,
    discovery_patterns: RwLock<HashMap<String, DiscoveryPattern>>,
    executions: RwLock<HashMap<String, ToolExecution>>,
    execution_retries: RwLock<HashMap<String, Vec<ExecutionRetry>>>,
    webhook_events: RwLock<HashMap<String, WebhookEvent>>,
    api_keys: RwLock<HashMap<String, ApiKey>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(what: &str, id: &str) -> CoreError {
    CoreError::NotFound(format!("{what} {id} not found"))
}

impl RelationalStore for InMemoryStore {
    fn insert_context(&self, ctx: Context) -> Result<()> {
        self.contexts.write().insert(ctx.id.clone(), ctx);
        Ok(())
    }

    fn get_context(&self, tenant_id: &str, id: &str) -> Result<Option<Context>> {
        Ok(self
            .contexts
            .read()
            .get(id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    fn update_context(&self, ctx: Context) -> Result<()> {
        let mut contexts = self.contexts.write();
        if !contexts.contains_key(&ctx.id) {
            return Err(not_found("context", &ctx.id));
        }
        contexts.insert(ctx.id.clone(), ctx);
        Ok(())
    }

    fn delete_context(&self, tenant_id: &str, id: &str) -> Result<bool> {
        let mut contexts = self.contexts.write();
        let owned = contexts.get(id).map(|c| c.tenant_id == tenant_id).unwrap_or(false);
        if owned {
            contexts.remove(id);
        }
        Ok(owned)
    }

    fn list_contexts(&self, tenant_id: &str, agent_id: Option<&str>) -> Result<Vec<Context>> {
        Ok(self
            .contexts
            .read()
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .filter(|c| agent_id.map(|a| c.agent_id == a).unwrap_or(true))
            .cloned()
            .collect())
    }

    fn search_contexts(&self, tenant_id: &str, query: &str) -> Result<Vec<Context>> {
        let needle = query.to_lowercase();
        Ok(self
            .contexts
            .read()
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .filter(|c| c.content.iter().any(|item| item.content.to_lowercase().contains(&needle)))
            .cloned()
            .collect())
    }

    fn insert_tool_config(&self, tool: ToolConfiguration) -> Result<()> {
        let mut configs = self.tool_configs.write();
        if configs
            .values()
            .any(|t| t.tenant_id == tool.tenant_id && t.tool_name == tool.tool_name)
        {
            return Err(CoreError::Conflict(format!(
                "tool {} already registered for tenant {}",
                tool.tool_name, tool.tenant_id
            )));
        }
        configs.insert(tool.id.clone(), tool);
        Ok(())
    }

    fn get_tool_config(&self, tenant_id: &str, id: &str) -> Result<Option<ToolConfiguration>> {
        Ok(self
            .tool_configs
            .read()
            .get(id)
            .filter(|t| t.tenant_id == tenant_id)
            .cloned())
    }

    fn get_tool_config_by_name(
        &self,
        tenant_id: &str,
        tool_name: &str,
    ) -> Result<Option<ToolConfiguration>> {
        Ok(self
            .tool_configs
            .read()
            .values()
            .find(|t| t.tenant_id == tenant_id && t.tool_name == tool_name)
            .cloned())
    }

    fn update_tool_config(&self, tool: ToolConfiguration) -> Result<()> {
        let mut configs = self.tool_configs.write();
        if !configs.contains_key(&tool.id) {
            return Err(not_found("tool config", &tool.id));
        }
        configs.insert(tool.id.clone(), tool);
        Ok(())
    }

    fn delete_tool_config(&self, tenant_id: &str, id: &str) -> Result<bool> {
        let mut configs = self.tool_configs.write();
        let owned = configs.get(id).map(|t| t.tenant_id == tenant_id).unwrap_or(false);
        if owned {
            configs.remove(id);
        }
        Ok(owned)
    }

    fn list_tool_configs(&self, tenant_id: &str) -> Result<Vec<ToolConfiguration>> {
        Ok(self
            .tool_configs
            .read()
            .values()
            .filter(|t| t.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    fn insert_discovery_session(&self, session: ToolDiscoverySession) -> Result<()> {
        self.discovery_sessions
            .write()
            .insert(session.session_id.clone(), session);
        Ok(())
    }

    fn get_discovery_session(
        &self,
        tenant_id: &str,
        session_id: &str,
    ) -> Result<Option<ToolDiscoverySession>> {
        Ok(self
            .discovery_sessions
            .read()
            .get(session_id)
            .filter(|s| s.tenant_id == tenant_id)
            .cloned())
    }

    fn update_discovery_session(&self, session: ToolDiscoverySession) -> Result<()> {
        let mut sessions = self.discovery_sessions.write();
        if !sessions.contains_key(&session.session_id) {
            return Err(not_found("discovery session", &session.session_id));
        }
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    fn upsert_discovery_pattern(&self, pattern: DiscoveryPattern) -> Result<()> {
        self.discovery_patterns
            .write()
            .insert(pattern.domain.clone(), pattern);
        Ok(())
    }

    fn get_discovery_pattern(&self, domain: &str) -> Result<Option<DiscoveryPattern>> {
        Ok(self.discovery_patterns.read().get(domain).cloned())
    }

    fn insert_execution(&self, exec: ToolExecution) -> Result<()> {
        self.executions.write().insert(exec.id.clone(), exec);
        Ok(())
    }

    fn update_execution(&self, exec: ToolExecution) -> Result<()> {
        let mut executions = self.executions.write();
        if !executions.contains_key(&exec.id) {
            return Err(not_found("execution", &exec.id));
        }
        executions.insert(exec.id.clone(), exec);
        Ok(())
    }

    fn get_execution(&self, tenant_id: &str, id: &str) -> Result<Option<ToolExecution>> {
        Ok(self
            .executions
            .read()
            .get(id)
            .filter(|e| e.tenant_id == tenant_id)
            .cloned())
    }

    fn list_executions(&self, tenant_id: &str, tool_config_id: &str) -> Result<Vec<ToolExecution>> {
        Ok(self
            .executions
            .read()
            .values()
            .filter(|e| e.tenant_id == tenant_id && e.tool_config_id == tool_config_id)
            .cloned()
            .collect())
    }

    fn insert_execution_retry(&self, retry: ExecutionRetry) -> Result<()> {
        self.execution_retries
            .write()
            .entry(retry.execution_id.clone())
            .or_default()
            .push(retry);
        Ok(())
    }

    fn list_execution_retries(&self, execution_id: &str) -> Result<Vec<ExecutionRetry>> {
        Ok(self
            .execution_retries
            .read()
            .get(execution_id)
            .cloned()
            .unwrap_or_default())
    }

    fn delete_executions_for_tool(&self, tenant_id: &str, tool_config_id: &str) -> Result<u64> {
        let ids: Vec<String> = self
            .executions
            .read()
            .values()
            .filter(|e| e.tenant_id == tenant_id && e.tool_config_id == tool_config_id)
            .map(|e| e.id.clone())
            .collect();

        let mut executions = self.executions.write();
        let mut retries = self.execution_retries.write();
        for id in &ids {
            executions.remove(id);
            retries.remove(id);
        }
        Ok(ids.len() as u64)
    }

    fn insert_webhook_event(&self, event: WebhookEvent) -> Result<()> {
        self.webhook_events.write().insert(event.id.clone(), event);
        Ok(())
    }

    fn update_webhook_event(&self, event: WebhookEvent) -> Result<()> {
        let mut events = self.webhook_events.write();
        if !events.contains_key(&event.id) {
            return Err(not_found("webhook event", &event.id));
        }
        events.insert(event.id.clone(), event);
        Ok(())
    }

    fn get_webhook_event(&self, tenant_id: &str, id: &str) -> Result<Option<WebhookEvent>> {
        Ok(self
            .webhook_events
            .read()
            .get(id)
            .filter(|e| e.tenant_id == tenant_id)
            .cloned())
    }

    fn insert_api_key(&self, key: ApiKey) -> Result<()> {
        self.api_keys.write().insert(key.id.clone(), key);
        Ok(())
    }

    fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>> {
        Ok(self.api_keys.read().get(id).cloned())
    }

    fn get_api_key_by_hashed_secret(&self, hashed_secret: &[u8]) -> Result<Option<ApiKey>> {
        Ok(self
            .api_keys
            .read()
            .values()
            .find(|k| k.hashed_secret == hashed_secret)
            .cloned())
    }

    fn list_api_keys(&self, tenant_id: &str) -> Result<Vec<ApiKey>> {
        Ok(self
            .api_keys
            .read()
            .values()
            .filter(|k| k.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

/// In-memory object store, tenant-namespaced by prefixing the key.
#[derive(Default)]
pub struct InMemoryObjectStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespaced(tenant_id: &str, key: &str) -> String {
        format!("{tenant_id}/{key}")
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, tenant_id: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.blobs
            .write()
            .insert(Self::namespaced(tenant_id, key), bytes);
        Ok(())
    }

    fn get(&self, tenant_id: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(&Self::namespaced(tenant_id, key)).cloned())
    }

    fn delete(&self, tenant_id: &str, key: &str) -> Result<bool> {
        Ok(self.blobs.write().remove(&Self::namespaced(tenant_id, key)).is_some())
    }
}

/// In-memory TTL cache. Expiry is checked lazily on read, matching this
/// repo's existing lazy-eviction idiom rather than a background sweep task.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (serde_json::Value, std::time::Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for InMemoryCache {
    fn put(&self, key: &str, value: serde_json::Value, ttl_secs: u64) {
        let expires_at = std::time::Instant::now() + std::time::Duration::from_secs(ttl_secs);
        self.entries.write().insert(key.to_string(), (value, expires_at));
    }

    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let entries = self.entries.read();
        let (value, expires_at) = entries.get(key)?;
        if std::time::Instant::now() >= *expires_at {
            return None;
        }
        Some(value.clone())
    }

    fn invalidate(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx(id: &str, tenant_id: &str) -> Context {
        Context {
            id: id.into(),
            tenant_id: tenant_id.into(),
            agent_id: "agent-1".into(),
            model_id: "model-1".into(),
            session_id: None,
            max_tokens: 1000,
            current_tokens: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            expires_at: None,
            metadata: Default::default(),
            version: 1,
            content: vec![],
        }
    }

    #[test]
    fn get_context_scoped_to_tenant() {
        let store = InMemoryStore::new();
        store.insert_context(ctx("c1", "tenant-a")).unwrap();
        assert!(store.get_context("tenant-a", "c1").unwrap().is_some());
        assert!(store.get_context("tenant-b", "c1").unwrap().is_none());
    }

    #[test]
    fn delete_context_respects_tenant_ownership() {
        let store = InMemoryStore::new();
        store.insert_context(ctx("c1", "tenant-a")).unwrap();
        assert!(!store.delete_context("tenant-b", "c1").unwrap());
        assert!(store.delete_context("tenant-a", "c1").unwrap());
    }

    #[test]
    fn duplicate_tool_name_per_tenant_conflicts() {
        use mcp_domain::tool_config::{AuthType, HealthStatus, RetryPolicy, ToolStatus};

        let store = InMemoryStore::new();
        let make = |id: &str| ToolConfiguration {
            id: id.into(),
            tenant_id: "tenant-a".into(),
            tool_name: "github".into(),
            display_name: "GitHub".into(),
            base_url: "https://api.github.com".into(),
            config: serde_json::json!({}),
            credentials_encrypted: vec![],
            auth_type: AuthType::Token,
            retry_policy: RetryPolicy::default(),
            status: ToolStatus::Active,
            health_status: HealthStatus::Unknown,
            last_health_check: None,
            webhook_config: None,
            passthrough_config: None,
            provider: None,
            actions: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert_tool_config(make("t1")).unwrap();
        let err = store.insert_tool_config(make("t2")).unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::Conflict);
    }

    #[test]
    fn cache_entries_expire() {
        let cache = InMemoryCache::new();
        cache.put("k", serde_json::json!(1), 0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cache.get("k").is_none());
    }
}
