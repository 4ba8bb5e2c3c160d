//! The per-connection MCP state machine (§4.7).
//!
//! `Opening` and `Authenticating` happen before a [`crate::session::SessionCore`]
//! exists at all — the gateway's upgrade handler checks the subprotocol and
//! resolves the caller's [`mcp_domain::Principal`] the same way
//! `nodes::ws::node_ws` validates a pre-shared token before calling
//! `ws.on_upgrade`. A `SessionCore` is only constructed once both have
//! succeeded, so it starts life in `Initializing`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Initializing,
    Ready,
    Closing,
    Closed,
}
