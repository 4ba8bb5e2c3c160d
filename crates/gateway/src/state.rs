//! Shared application state handed to every REST/WS handler.
//!
//! Deliberately thin compared to a monolithic per-feature `AppState`: the
//! gateway's own job is auth, routing, and transport, so the one piece of
//! state it owns beyond the process-wide store backends is the key resolver
//! used to turn a bearer token into a tenant before anything else runs.

use std::sync::Arc;

use mcp_domain::config::Config;
use mcp_session::SharedDeps;
use mcp_store::KeyResolver;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub deps: SharedDeps,
    pub keys: Arc<KeyResolver>,
}
