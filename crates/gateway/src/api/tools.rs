//! `/api/v1/tools` — the Dynamic Tool Registry's REST surface (§4.5, §6).
//!
//! `discover`/`confirm`/`update` reuse the free functions `dispatch.rs`
//! already exports for exactly this purpose; `list`/`get`/`delete`/`health`
//! call `ToolRegistry` directly since no WS method surfaces them (§6: tool
//! management is REST-only, `tools/list` on the WS side is a slimmer
//! read-only projection for the calling agent, not the operator's CRUD view).

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use mcp_domain::principal::Principal;
use mcp_domain::tool_config::{AuthType, HealthStatus, ToolStatus};
use mcp_registry::{ConfirmToolSelection, ToolFilter, UpdateToolRequest};
use mcp_session::{dispatch, TenantHandlers};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Mirrors `dispatch::ToolSummary`: the wire projection of a
/// `ToolConfiguration` never carries `credentials_encrypted`.
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

pub async fn list_tools(Extension(handlers): Extension<Arc<TenantHandlers>>) -> ApiResult<Json<Value>> {
    let tools = handlers.registry.list_tools(ToolFilter::default()).map_err(ApiError)?;
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
    Ok(Json(serde_json::to_value(summaries).map_err(|e| ApiError(e.into()))?))
}

#[derive(Deserialize)]
pub struct DiscoverBody {
    base_url: String,
}

pub async fn discover(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Json(body): Json<DiscoverBody>,
) -> ApiResult<Json<Value>> {
    Ok(Json(dispatch::discover_tool(&handlers, body.base_url).await.map_err(ApiError)?))
}

#[derive(Deserialize)]
pub struct ConfirmBody {
    selected_url: String,
    tool_name: String,
    display_name: String,
    auth_type: AuthType,
    #[serde(default)]
    credentials: Value,
    #[serde(default)]
    retry_policy: Option<mcp_domain::tool_config::RetryPolicy>,
    #[serde(default)]
    webhook_config: Option<mcp_domain::tool_config::WebhookConfig>,
    #[serde(default)]
    passthrough_config: Option<mcp_domain::tool_config::PassthroughConfig>,
    #[serde(default)]
    provider: Option<String>,
}

pub async fn confirm_discovery(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Path(session_id): Path<String>,
    Json(body): Json<ConfirmBody>,
) -> ApiResult<Json<Value>> {
    let selection = ConfirmToolSelection {
        selected_url: body.selected_url,
        tool_name: body.tool_name,
        display_name: body.display_name,
        auth_type: body.auth_type,
        credentials: body.credentials,
        retry_policy: body.retry_policy,
        webhook_config: body.webhook_config,
        passthrough_config: body.passthrough_config,
        provider: body.provider,
    };
    Ok(Json(
        dispatch::confirm_tool(&handlers, &session_id, selection).await.map_err(ApiError)?,
    ))
}

pub async fn get_tool(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let tool = handlers.registry.get_tool(&id).map_err(ApiError)?;
    Ok(Json(serde_json::to_value(tool).map_err(|e| ApiError(e.into()))?))
}

#[derive(Deserialize, Default)]
pub struct UpdateToolBody {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    config: Option<Value>,
    #[serde(default)]
    credentials: Option<Value>,
    #[serde(default)]
    retry_policy: Option<mcp_domain::tool_config::RetryPolicy>,
    #[serde(default)]
    status: Option<ToolStatus>,
    #[serde(default)]
    webhook_config: Option<mcp_domain::tool_config::WebhookConfig>,
    #[serde(default)]
    passthrough_config: Option<mcp_domain::tool_config::PassthroughConfig>,
}

pub async fn update_tool(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateToolBody>,
) -> ApiResult<Json<Value>> {
    let update = UpdateToolRequest {
        display_name: body.display_name,
        config: body.config,
        credentials: body.credentials,
        retry_policy: body.retry_policy,
        status: body.status,
        webhook_config: body.webhook_config,
        passthrough_config: body.passthrough_config,
    };
    Ok(Json(dispatch::update_tool(&handlers, &id, update).map_err(ApiError)?))
}

pub async fn delete_tool(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let deleted = handlers.registry.delete_tool(&id).map_err(ApiError)?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

pub async fn health_check(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let tool = handlers.registry.health_check(&id).await.map_err(ApiError)?;
    Ok(Json(serde_json::to_value(tool).map_err(|e| ApiError(e.into()))?))
}

pub async fn execute_tool(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let result = dispatch::dispatch(
        &handlers,
        &principal.key_id,
        &principal.allowed_services,
        mcp_protocol::methods::TOOLS_CALL,
        Some(body),
    )
    .await
    .map_err(ApiError)?;
    Ok(Json(result))
}

pub async fn execute_batch(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let result = dispatch::dispatch(
        &handlers,
        &principal.key_id,
        &principal.allowed_services,
        mcp_protocol::methods::TOOLS_BATCH,
        Some(body),
    )
    .await
    .map_err(ApiError)?;
    Ok(Json(result))
}
