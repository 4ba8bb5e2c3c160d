//! WebSocket endpoint for the MCP channel (§4.7, §6 — `GET /ws`).
//!
//! Structurally this is the teacher's node WebSocket handler
//! (`nodes/ws.rs::handle_socket`) generalized two ways: the per-connection
//! state machine moves into `mcp-session::SessionCore`, which only ever sees
//! `Envelope`s, and the single pre-shared `SA_NODE_TOKEN` becomes a
//! per-tenant `Principal` resolved the same way the REST surface resolves
//! one. This module keeps the one job the teacher's handler keeps doing
//! itself: owning the raw `WebSocket` split, translating frames, and
//! running the ping/pong keepalive — everything past framing is the
//! session's problem, not this module's.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use mcp_domain::error::CoreError;
use mcp_domain::principal::Principal;
use mcp_protocol::Envelope;
use mcp_session::{SessionCore, TenantHandlers};
use parking_lot::Mutex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    /// Bearer token, for clients that cannot set the `Authorization` header
    /// on the upgrade request (mirrors the teacher's `?token=` node-auth
    /// query param).
    pub token: Option<String>,
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn offers_mcp_v1(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|p| p.trim() == "mcp.v1"))
        .unwrap_or(false)
}

fn resolve_principal(state: &AppState, token: Option<&str>) -> Result<Principal, CoreError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CoreError::Unauthenticated("missing bearer token".into()))?;
    let hashed = Sha256::digest(token.as_bytes());
    state.keys.resolve(&hashed)
}

/// `GET /ws` — upgrade to the MCP WebSocket channel.
pub async fn mcp_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsAuthQuery>,
) -> Response {
    let has_mcp_v1 = offers_mcp_v1(&headers);
    let token = bearer_from_headers(&headers).or(query.token);

    ws.protocols(["mcp.v1"])
        .on_upgrade(move |socket| async move {
            if !has_mcp_v1 {
                close_with_code(socket, 1002, "subprotocol must be mcp.v1").await;
                return;
            }
            let principal = match resolve_principal(&state, token.as_deref()) {
                Ok(p) => p,
                Err(e) => {
                    close_with_code(socket, e.ws_close_code(), &e.to_string()).await;
                    return;
                }
            };
            handle_socket(socket, state, principal).await;
        })
        .into_response()
}

async fn close_with_code(mut socket: WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_owned().into(),
        })))
        .await;
}

async fn handle_socket(socket: WebSocket, state: AppState, principal: Principal) {
    let (ws_sink, mut ws_stream) = socket.split();

    let handlers = TenantHandlers::new(&state.deps, &principal.tenant_id);
    let (outbound_tx, outbound_rx) = mpsc::channel::<Envelope>(64);
    let (inbound_tx, inbound_rx) = mpsc::channel::<Envelope>(64);

    let session = SessionCore::new(
        handlers,
        principal.key_id.clone(),
        principal.allowed_services.clone(),
        outbound_tx,
    );
    let ping_interval = Duration::from_secs(state.config.server.ping_interval_secs.max(1));
    let last_pong = Arc::new(Mutex::new(Instant::now()));

    let run_handle = tokio::spawn(session.clone().run(inbound_rx));
    let writer_handle = tokio::spawn(writer_task(ws_sink, outbound_rx, ping_interval));
    let watchdog_handle = tokio::spawn(watchdog_task(session.clone(), last_pong.clone(), ping_interval));

    let max_bytes = state.config.server.max_message_size_bytes;
    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if text.len() > max_bytes {
                    tracing::debug!(bytes = text.len(), max_bytes, "dropping oversized WS frame");
                    continue;
                }
                match serde_json::from_str::<Envelope>(&text) {
                    Ok(env) => {
                        if inbound_tx.send(env).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "ignoring unparseable frame"),
                }
            }
            Ok(Message::Pong(_)) => {
                *last_pong.lock() = Instant::now();
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    session.begin_close();
    drop(inbound_tx);
    let _ = run_handle.await;
    watchdog_handle.abort();
    writer_handle.abort();
}

async fn writer_task(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Envelope>,
    ping_interval: Duration,
) {
    let mut ticker = tokio::time::interval(ping_interval);
    loop {
        tokio::select! {
            maybe_env = outbound_rx.recv() => {
                match maybe_env {
                    Some(env) => {
                        let Ok(json) = serde_json::to_string(&env) else { continue };
                        if sink.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Closes the session after two consecutive missed pongs (§4.7 keepalive).
async fn watchdog_task(session: Arc<SessionCore>, last_pong: Arc<Mutex<Instant>>, ping_interval: Duration) {
    let mut ticker = tokio::time::interval(ping_interval);
    loop {
        ticker.tick().await;
        if last_pong.lock().elapsed() > ping_interval * 2 {
            session.begin_close();
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn offers_mcp_v1_matches_single_value() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("mcp.v1"));
        assert!(offers_mcp_v1(&headers));
    }

    #[test]
    fn offers_mcp_v1_matches_within_comma_list() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static("graphql-ws, mcp.v1"),
        );
        assert!(offers_mcp_v1(&headers));
    }

    #[test]
    fn offers_mcp_v1_false_when_absent() {
        let headers = HeaderMap::new();
        assert!(!offers_mcp_v1(&headers));
    }

    #[test]
    fn offers_mcp_v1_false_on_mismatch() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("mcp.v2"));
        assert!(!offers_mcp_v1(&headers));
    }

    #[test]
    fn bearer_from_headers_strips_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-1"));
        assert_eq!(bearer_from_headers(&headers), Some("tok-1".to_owned()));
    }

    #[test]
    fn bearer_from_headers_none_without_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_from_headers(&headers), None);
    }
}
