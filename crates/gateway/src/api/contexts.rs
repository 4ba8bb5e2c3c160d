//! `/api/v1/contexts` — thin REST shims over the same
//! `mcp_session::dispatch::dispatch` call the WS session core uses for
//! `contexts/*` (§4.7's own doc comment anticipates this reuse), so the two
//! transports can never drift on context semantics.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use mcp_domain::principal::Principal;
use mcp_protocol::methods;
use mcp_session::TenantHandlers;
use serde_json::Value;

use crate::error::ApiResult;

pub async fn create_context(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let result = mcp_session::dispatch::dispatch(
        &handlers,
        &principal.key_id,
        &principal.allowed_services,
        methods::CONTEXTS_CREATE,
        Some(body),
    )
    .await
    .map_err(crate::error::ApiError)?;
    Ok(Json(result))
}

pub async fn list_contexts(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Extension(principal): Extension<Principal>,
    axum::extract::Query(query): axum::extract::Query<std::collections::HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let params = serde_json::json!({ "agent_id": query.get("agent_id") });
    let result = mcp_session::dispatch::dispatch(
        &handlers,
        &principal.key_id,
        &principal.allowed_services,
        methods::CONTEXTS_LIST,
        Some(params),
    )
    .await
    .map_err(crate::error::ApiError)?;
    Ok(Json(result))
}

pub async fn get_context(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let params = serde_json::json!({ "id": id });
    let result = mcp_session::dispatch::dispatch(
        &handlers,
        &principal.key_id,
        &principal.allowed_services,
        methods::CONTEXTS_GET,
        Some(params),
    )
    .await
    .map_err(crate::error::ApiError)?;
    Ok(Json(result))
}

pub async fn update_context(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(mut body): Json<Value>,
) -> ApiResult<Json<Value>> {
    body.as_object_mut()
        .map(|o| o.insert("id".to_string(), Value::String(id)));
    let result = mcp_session::dispatch::dispatch(
        &handlers,
        &principal.key_id,
        &principal.allowed_services,
        methods::CONTEXTS_UPDATE,
        Some(body),
    )
    .await
    .map_err(crate::error::ApiError)?;
    Ok(Json(result))
}

pub async fn delete_context(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let params = serde_json::json!({ "id": id });
    let result = mcp_session::dispatch::dispatch(
        &handlers,
        &principal.key_id,
        &principal.allowed_services,
        methods::CONTEXTS_DELETE,
        Some(params),
    )
    .await
    .map_err(crate::error::ApiError)?;
    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct SearchBody {
    query: String,
}

pub async fn search_context(
    Extension(handlers): Extension<Arc<TenantHandlers>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<SearchBody>,
) -> ApiResult<Json<Value>> {
    let params = serde_json::json!({ "id": id, "query": body.query });
    let result = mcp_session::dispatch::dispatch(
        &handlers,
        &principal.key_id,
        &principal.allowed_services,
        methods::CONTEXTS_SEARCH,
        Some(params),
    )
    .await
    .map_err(crate::error::ApiError)?;
    Ok(Json(result))
}
