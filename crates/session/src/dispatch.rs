//! Maps an inbound MCP `method` + `params` onto the tenant's managers and
//! back to a `result` value (§4.7 "Supported methods").
//!
//! `resources/*` and `prompts/*` are part of the method surface the
//! `initialize` handshake advertises capabilities for, but this server has
//! no resource or prompt domain model — `list` replies with an empty
//! collection and `read`/`get` reply `NotFound`, the same shape a real
//! backend would return for a tenant with nothing registered.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mcp_context::{CreateContextRequest, UpdateContextRequest, UpdateOptions};
use mcp_domain::context::{ContextItem, Role, TruncateStrategy};
use mcp_domain::error::{CoreError, Result};
use mcp_domain::execution::{BatchCall, BatchMode};
use mcp_domain::param::ParamValue;
use mcp_domain::tool_config::{AuthType, HealthStatus, ToolStatus};
use mcp_executor::ExecuteToolRequest;
use mcp_protocol::methods;
use mcp_registry::{ConfirmToolSelection, DiscoverToolRequest, ToolFilter, UpdateToolRequest};
use serde::Deserialize;
use serde_json::Value;

use crate::handlers::TenantHandlers;

fn params_or_empty(params: Option<Value>) -> Value {
    params.unwrap_or(Value::Object(Default::default()))
}

fn parse<T: for<'de> Deserialize<'de>>(params: Option<Value>) -> Result<T> {
    serde_json::from_value(params_or_empty(params))
        .map_err(|e| CoreError::InvalidArgument(format!("invalid params: {e}")))
}

#[derive(Deserialize)]
struct ContextItemWire {
    role: Role,
    content: String,
    #[serde(default)]
    tokens: u32,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

fn wire_to_item(now: DateTime<Utc>, w: ContextItemWire) -> ContextItem {
    ContextItem {
        id: String::new(),
        role: w.role,
        content: w.content,
        tokens: w.tokens,
        timestamp: now,
        metadata: w.metadata,
    }
}

#[derive(Deserialize)]
struct ContextsCreateParams {
    agent_id: String,
    model_id: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    content: Vec<ContextItemWire>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct ContextsGetParams {
    id: String,
}

#[derive(Deserialize)]
struct ContextsUpdateParams {
    id: String,
    #[serde(default)]
    content: Vec<ContextItemWire>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
    #[serde(default)]
    replace: bool,
    #[serde(default = "default_true")]
    truncate: bool,
    #[serde(default)]
    truncate_strategy: TruncateStrategy,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct ContextsDeleteParams {
    id: String,
}

#[derive(Deserialize)]
struct ContextsListParams {
    #[serde(default)]
    agent_id: Option<String>,
}

#[derive(Deserialize)]
struct ContextsSearchParams {
    id: String,
    query: String,
}

#[derive(Deserialize)]
struct ToolsCallParams {
    tool_id: String,
    action: String,
    #[serde(default)]
    parameters: Value,
    #[serde(default)]
    passthrough_token: Option<String>,
}

#[derive(Deserialize)]
struct ToolsBatchParams {
    calls: Vec<ToolsBatchCallParams>,
    #[serde(default)]
    mode: BatchModeWire,
    #[serde(default)]
    stop_on_error: bool,
}

#[derive(Deserialize)]
struct ToolsBatchCallParams {
    tool_id: String,
    action: String,
    #[serde(default)]
    parameters: Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "snake_case")]
enum BatchModeWire {
    #[default]
    Sequential,
    Parallel,
}

/// A client-facing projection of `ToolConfiguration` that never carries the
/// encrypted credential envelope — the wire has no legitimate reader for it.
#[derive(serde::Serialize)]
struct ToolSummary<'a> {
    id: &'a str,
    tool_name: &'a str,
    display_name: &'a str,
    base_url: &'a str,
    auth_type: AuthType,
    status: ToolStatus,
    health_status: HealthStatus,
    actions: &'a std::collections::BTreeMap<String, Value>,
}

/// Rejects a tool call whose tool is not in the caller's `allowed_services`
/// (§4.1) before it ever reaches the executor.
fn check_service_scope(handlers: &TenantHandlers, allowed_services: &[String], tool_id: &str) -> Result<()> {
    let tool = handlers.registry.get_tool(tool_id)?;
    if allowed_services.iter().any(|s| s == &tool.tool_name) {
        Ok(())
    } else {
        Err(CoreError::PermissionDenied(format!(
            "service {} is not in this key's allowed_services",
            tool.tool_name
        )))
    }
}

pub async fn dispatch(
    handlers: &TenantHandlers,
    executed_by: &str,
    allowed_services: &[String],
    method: &str,
    params: Option<Value>,
) -> Result<Value> {
    match method {
        methods::TOOLS_LIST => {
            let tools = handlers.registry.list_tools(ToolFilter {
                status: Some(ToolStatus::Active),
            })?;
            let summaries: Vec<ToolSummary> = tools
                .iter()
                .map(|t| ToolSummary {
                    id: &t.id,
                    tool_name: &t.tool_name,
                    display_name: &t.display_name,
                    base_url: &t.base_url,
                    auth_type: t.auth_type,
                    status: t.status,
                    health_status: t.health_status,
                    actions: &t.actions,
                })
                .collect();
            Ok(serde_json::to_value(summaries)?)
        }
        methods::TOOLS_CALL => {
            let p: ToolsCallParams = parse(params)?;
            check_service_scope(handlers, allowed_services, &p.tool_id)?;
            let outcome = handlers
                .executor
                .execute_tool(ExecuteToolRequest {
                    tool_id: p.tool_id,
                    action: p.action,
                    parameters: ParamValue::from_json(p.parameters),
                    executed_by: executed_by.to_string(),
                    passthrough_token: p.passthrough_token,
                })
                .await?;
            Ok(serde_json::json!({
                "execution_id": outcome.execution_id,
                "response_time_ms": outcome.response_time_ms,
                "retry_count": outcome.retry_count,
                "result": outcome.result,
                "error": outcome.error,
            }))
        }
        methods::TOOLS_BATCH => {
            let p: ToolsBatchParams = parse(params)?;
            for call in &p.calls {
                check_service_scope(handlers, allowed_services, &call.tool_id)?;
            }
            let mode = match p.mode {
                BatchModeWire::Sequential => BatchMode::Sequential,
                BatchModeWire::Parallel => BatchMode::Parallel,
            };
            let calls = p
                .calls
                .into_iter()
                .map(|c| BatchCall {
                    tool_id: c.tool_id,
                    action: c.action,
                    parameters: ParamValue::from_json(c.parameters),
                })
                .collect();
            let result = handlers
                .executor
                .execute_batch(calls, mode, p.stop_on_error, executed_by)
                .await?;
            Ok(serde_json::to_value(result)?)
        }
        methods::RESOURCES_LIST => Ok(serde_json::json!({"resources": []})),
        methods::RESOURCES_READ => Err(CoreError::NotFound("no resources are registered".into())),
        methods::PROMPTS_LIST => Ok(serde_json::json!({"prompts": []})),
        methods::PROMPTS_GET => Err(CoreError::NotFound("no prompts are registered".into())),
        methods::CONTEXTS_CREATE => {
            let p: ContextsCreateParams = parse(params)?;
            let now = Utc::now();
            let ctx = handlers.contexts.create_context(CreateContextRequest {
                agent_id: p.agent_id,
                model_id: p.model_id,
                session_id: p.session_id,
                max_tokens: p.max_tokens,
                content: p.content.into_iter().map(|w| wire_to_item(now, w)).collect(),
                metadata: p.metadata,
                expires_at: None,
            })?;
            Ok(serde_json::to_value(ctx)?)
        }
        methods::CONTEXTS_GET => {
            let p: ContextsGetParams = parse(params)?;
            Ok(serde_json::to_value(handlers.contexts.get_context(&p.id)?)?)
        }
        methods::CONTEXTS_UPDATE => {
            let p: ContextsUpdateParams = parse(params)?;
            let now = Utc::now();
            let mode = if p.replace {
                mcp_context::UpdateMode::Replace
            } else {
                mcp_context::UpdateMode::Append
            };
            let ctx = handlers.contexts.update_context(
                &p.id,
                UpdateContextRequest {
                    content: p.content.into_iter().map(|w| wire_to_item(now, w)).collect(),
                    metadata: p.metadata,
                },
                UpdateOptions {
                    mode,
                    truncate: p.truncate,
                    truncate_strategy: p.truncate_strategy,
                },
            )?;
            Ok(serde_json::to_value(ctx)?)
        }
        methods::CONTEXTS_DELETE => {
            let p: ContextsDeleteParams = parse(params)?;
            let deleted = handlers.contexts.delete_context(&p.id)?;
            Ok(serde_json::json!({"deleted": deleted}))
        }
        methods::CONTEXTS_LIST => {
            let p: ContextsListParams = parse(params)?;
            let contexts = handlers.contexts.list_contexts(p.agent_id.as_deref())?;
            Ok(serde_json::to_value(contexts)?)
        }
        methods::CONTEXTS_SEARCH => {
            let p: ContextsSearchParams = parse(params)?;
            let items = handlers.contexts.search_in_context(&p.id, &p.query)?;
            Ok(serde_json::to_value(items)?)
        }
        other => Err(CoreError::InvalidArgument(format!("unknown method {other}"))),
    }
}

/// Discovery/registry methods aren't part of the MCP method surface proper
/// (§6 exposes them over REST instead), but the registry calls they wrap are
/// reused verbatim by the REST handlers in `crates/gateway`.
pub async fn discover_tool(handlers: &TenantHandlers, base_url: String) -> Result<Value> {
    let session = handlers
        .registry
        .discover_tool(DiscoverToolRequest { base_url })
        .await?;
    Ok(serde_json::to_value(session)?)
}

pub async fn confirm_tool(
    handlers: &TenantHandlers,
    session_id: &str,
    selection: ConfirmToolSelection,
) -> Result<Value> {
    Ok(serde_json::to_value(
        handlers.registry.confirm_tool(session_id, selection).await?,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::SharedDeps;
    use mcp_domain::error::ErrorCode;
    use mcp_domain::tool_config::{AuthType, HealthStatus, RetryPolicy, ToolConfiguration, ToolStatus};
    use mcp_executor::CircuitBreakerRegistry;
    use mcp_store::{InMemoryCache, InMemoryObjectStore, InMemoryStore, TenantScopedStore};
    use mcp_vault::Vault;
    use std::sync::Arc;
    use std::time::Duration;

    fn handlers_with_tool(tenant_id: &str, tool_name: &str) -> (TenantHandlers, String) {
        let deps = SharedDeps {
            relational: Arc::new(InMemoryStore::new()),
            objects: Arc::new(InMemoryObjectStore::new()),
            cache: Arc::new(InMemoryCache::new()),
            vault: Arc::new(Vault::new(b"test-master-secret".to_vec(), 1)),
            breakers: Arc::new(CircuitBreakerRegistry::new(5, Duration::from_secs(30))),
        };
        let handlers = TenantHandlers::new(&deps, tenant_id);
        let now = Utc::now();
        let tool_id = "tool-1".to_string();
        let store = TenantScopedStore::new(
            deps.relational.clone(),
            deps.objects.clone(),
            deps.cache.clone(),
            tenant_id,
        );
        store
            .insert_tool_config(ToolConfiguration {
                id: tool_id.clone(),
                tenant_id: tenant_id.to_string(),
                tool_name: tool_name.to_string(),
                display_name: tool_name.to_string(),
                base_url: "https://example.test".to_string(),
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
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        (handlers, tool_id)
    }

    #[test]
    fn check_service_scope_allows_listed_service() {
        let (handlers, tool_id) = handlers_with_tool("tenant-a", "github");
        assert!(check_service_scope(&handlers, &["github".to_string()], &tool_id).is_ok());
    }

    #[test]
    fn check_service_scope_rejects_unlisted_service() {
        let (handlers, tool_id) = handlers_with_tool("tenant-a", "github");
        let err = check_service_scope(&handlers, &["slack".to_string()], &tool_id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn tools_call_rejects_a_tool_outside_allowed_services() {
        let (handlers, tool_id) = handlers_with_tool("tenant-a", "github");
        let params = serde_json::json!({ "tool_id": tool_id, "action": "list_repos" });
        let err = dispatch(&handlers, "caller", &["slack".to_string()], methods::TOOLS_CALL, Some(params))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn contexts_update_threads_the_truncate_strategy_through() {
        let (handlers, _tool_id) = handlers_with_tool("tenant-a", "github");
        let created = handlers
            .contexts
            .create_context(CreateContextRequest {
                agent_id: "agent-1".into(),
                model_id: "model-1".into(),
                session_id: None,
                max_tokens: Some(10),
                content: vec![],
                metadata: Default::default(),
                expires_at: None,
            })
            .unwrap();

        let params = serde_json::json!({
            "id": created.id,
            "content": [{"role": "user", "content": "hi", "tokens": 5}],
            "truncate_strategy": "preserving_user",
        });
        let result = dispatch(&handlers, "caller", &[], methods::CONTEXTS_UPDATE, Some(params))
            .await
            .unwrap();
        assert!(result.get("id").is_some());
    }
}

pub fn update_tool(handlers: &TenantHandlers, tool_id: &str, update: UpdateToolRequest) -> Result<Value> {
    Ok(serde_json::to_value(handlers.registry.update_tool(tool_id, update)?)?)
}
