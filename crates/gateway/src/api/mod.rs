pub mod auth;
pub mod contexts;
pub mod health;
pub mod tools;
pub mod webhooks;

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::state::AppState;

/// Builds the full REST router (§6).
///
/// `/health`, `/version`, and the webhook ingress route stay public — the
/// first two so a load balancer can probe without a key, the third because
/// its caller is a third-party tool provider with no tenant API key, only
/// whatever signature its own `webhook_config` was set up with. Everything
/// else sits behind [`auth::require_principal`], which resolves the caller's
/// tenant and builds the `TenantHandlers` the handlers above pull out of the
/// request extensions.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/version", get(health::version))
        .route("/webhooks/tools/:tenant_id/:tool_id", post(webhooks::ingest))
        .route("/ws", get(crate::ws::mcp_ws));

    let protected = Router::new()
        .route("/api/v1/contexts", post(contexts::create_context))
        .route("/api/v1/contexts", get(contexts::list_contexts))
        .route("/api/v1/contexts/:id", get(contexts::get_context))
        .route("/api/v1/contexts/:id", put(contexts::update_context))
        .route("/api/v1/contexts/:id", delete(contexts::delete_context))
        .route("/api/v1/contexts/:id/search", post(contexts::search_context))
        .route("/api/v1/tools", get(tools::list_tools))
        .route("/api/v1/tools/discover", post(tools::discover))
        .route("/api/v1/tools/discovery/:session_id/confirm", post(tools::confirm_discovery))
        .route("/api/v1/tools/:id", get(tools::get_tool))
        .route("/api/v1/tools/:id", put(tools::update_tool))
        .route("/api/v1/tools/:id", delete(tools::delete_tool))
        .route("/api/v1/tools/:id/health", post(tools::health_check))
        .route("/api/v1/tools/:id/execute", post(tools::execute_tool))
        .route("/api/v1/tools/batch", post(tools::execute_batch))
        .route_layer(middleware::from_fn_with_state(state, auth::require_principal));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
