//! Builds the tenant-scoped managers a [`crate::session::SessionCore`]
//! dispatches onto, from the shared process-wide store backends plus the
//! tenant resolved at authentication.

use std::sync::Arc;

use mcp_context::ContextManager;
use mcp_executor::{CircuitBreakerRegistry, ToolExecutor};
use mcp_registry::ToolRegistry;
use mcp_store::{Cache, ObjectStore, RelationalStore, TenantScopedStore};
use mcp_vault::Vault;

/// Process-wide backends, shared across every connection and tenant.
#[derive(Clone)]
pub struct SharedDeps {
    pub relational: Arc<dyn RelationalStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub cache: Arc<dyn Cache>,
    pub vault: Arc<Vault>,
    pub breakers: Arc<CircuitBreakerRegistry>,
}

/// The managers one authenticated connection dispatches method calls onto.
/// Built once, right after authentication, from the tenant resolved by the
/// gateway's key lookup.
pub struct TenantHandlers {
    pub contexts: ContextManager,
    pub registry: ToolRegistry,
    pub executor: ToolExecutor,
}

impl TenantHandlers {
    pub fn new(deps: &SharedDeps, tenant_id: &str) -> Self {
        let store = || {
            TenantScopedStore::new(
                deps.relational.clone(),
                deps.objects.clone(),
                deps.cache.clone(),
                tenant_id,
            )
        };
        Self {
            contexts: ContextManager::new(store()),
            registry: ToolRegistry::new(store(), deps.vault.clone()),
            executor: ToolExecutor::new(store(), deps.vault.clone(), deps.breakers.clone()),
        }
    }
}
