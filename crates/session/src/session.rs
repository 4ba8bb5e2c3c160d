//! Per-connection MCP run loop (§4.7).
//!
//! Text (de)serialization and the WebSocket ping/pong frames themselves are
//! the gateway's job — `crates/gateway`'s `/ws` handler is the direct
//! descendant of `nodes::ws::handle_socket`: it owns the `SplitSink`/
//! `SplitStream` halves, feeds parsed [`Envelope`]s into `run`'s `inbound`
//! channel, and drains `outbound` into the socket from a dedicated writer
//! task, the same split `handle_socket` already uses for node connections.
//! This module owns everything above that: the `Initializing -> Ready ->
//! Closing -> Closed` state machine, per-request concurrency via
//! `tokio::spawn` (so one slow tool call can't stall demultiplexing of the
//! next frame), `id`-keyed cancellation, and backpressure on in-flight
//! requests — the direct generalization of `ToolRouter`'s pending-request
//! map from "one node, fire tool_request, await tool_response" to "one
//! tenant, fan out to whichever manager the method names, await its result".

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mcp_domain::error::CoreError;
use mcp_protocol::envelope::{Envelope, FrameType};
use mcp_protocol::error::ProtocolError;
use mcp_protocol::init::{self, InitializeParams, InitializeResult, NegotiationOutcome, ServerCapabilities};
use mcp_protocol::methods;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch;
use crate::handlers::TenantHandlers;
use crate::state::ConnectionState;

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;
/// Inbound frames over this size are rejected before they ever reach
/// `serde_json` — enforced by the gateway's text-frame reader, which is the
/// only layer that sees the frame's raw byte length.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

pub struct SessionCore {
    handlers: TenantHandlers,
    executed_by: String,
    allowed_services: Vec<String>,
    outbound: mpsc::Sender<Envelope>,
    state: Mutex<ConnectionState>,
    in_flight: AtomicUsize,
    max_in_flight: usize,
    cancellations: Mutex<HashMap<u64, CancellationToken>>,
}

impl SessionCore {
    pub fn new(
        handlers: TenantHandlers,
        executed_by: String,
        allowed_services: Vec<String>,
        outbound: mpsc::Sender<Envelope>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handlers,
            executed_by,
            allowed_services,
            outbound,
            state: Mutex::new(ConnectionState::Initializing),
            in_flight: AtomicUsize::new(0),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            cancellations: Mutex::new(HashMap::new()),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    async fn send(&self, env: Envelope) {
        if self.outbound.send(env).await.is_err() {
            tracing::debug!("outbound channel closed, dropping frame");
        }
    }

    /// Cancels a specific in-flight request by its `id`, letting an explicit
    /// client cancellation (rather than just a deadline) abort the nested
    /// Tool Executor call (§5).
    pub fn cancel_request(&self, id: u64) {
        if let Some(token) = self.cancellations.lock().get(&id) {
            token.cancel();
        }
    }

    /// Moves the connection to `Closing` and cancels every in-flight
    /// request. Call on a client close frame or a fatal transport error.
    pub fn begin_close(&self) {
        *self.state.lock() = ConnectionState::Closing;
        for token in self.cancellations.lock().values() {
            token.cancel();
        }
    }

    /// Runs until `inbound` closes (the gateway's reader loop ended) or the
    /// initialize handshake fails. Consumes `self` via `Arc` so spawned
    /// per-request workers can outlive the call that created them.
    pub async fn run(self: Arc<Self>, mut inbound: mpsc::Receiver<Envelope>) {
        if !wait_for_initialize(&self, &mut inbound).await {
            *self.state.lock() = ConnectionState::Closed;
            return;
        }
        *self.state.lock() = ConnectionState::Ready;

        while let Some(env) = inbound.recv().await {
            if self.state() == ConnectionState::Closing {
                break;
            }
            handle_frame(&self, env).await;
        }

        self.begin_close();
        *self.state.lock() = ConnectionState::Closed;
    }
}

/// Loops on `initialize` attempts: a version mismatch gets one reply
/// offering the highest supported version and keeps waiting rather than
/// closing (§4.7 decision on version negotiation).
async fn wait_for_initialize(session: &Arc<SessionCore>, inbound: &mut mpsc::Receiver<Envelope>) -> bool {
    loop {
        let env = match tokio::time::timeout(DEFAULT_INIT_TIMEOUT, inbound.recv()).await {
            Ok(Some(env)) => env,
            Ok(None) => return false,
            Err(_) => {
                tracing::warn!("client did not send initialize within the timeout");
                return false;
            }
        };

        if env.frame_type != FrameType::Request || env.method.as_deref() != Some(methods::INITIALIZE) {
            if let Some(id) = env.id {
                session
                    .send(Envelope::error_response(
                        id,
                        ProtocolError::new("PROTOCOL_ERROR", "expected an initialize request"),
                    ))
                    .await;
            }
            continue;
        }
        let Some(id) = env.id else { continue };

        let params: InitializeParams = match env.params.and_then(|v| serde_json::from_value(v).ok()) {
            Some(p) => p,
            None => {
                session
                    .send(Envelope::error_response(
                        id,
                        ProtocolError::from(CoreError::InvalidArgument(
                            "initialize requires protocol_version and client_info".into(),
                        )),
                    ))
                    .await;
                continue;
            }
        };

        let (version, accepted) = match init::negotiate(&params.protocol_version) {
            NegotiationOutcome::Accepted(v) => (v, true),
            NegotiationOutcome::Offered(v) => (v, false),
        };
        let result = InitializeResult {
            protocol_version: version,
            capabilities: ServerCapabilities::full(),
        };
        session
            .send(Envelope::response(id, serde_json::json!(result)))
            .await;

        if accepted {
            return true;
        }
    }
}

async fn handle_frame(session: &Arc<SessionCore>, env: Envelope) {
    match env.frame_type {
        FrameType::Request => handle_request(session, env).await,
        FrameType::Notification | FrameType::Response | FrameType::Error => {
            tracing::debug!(frame_type = ?env.frame_type, "ignoring non-request inbound frame");
        }
    }
}

async fn handle_request(session: &Arc<SessionCore>, env: Envelope) {
    let Some(id) = env.id else {
        tracing::debug!("request frame carried no id, dropping");
        return;
    };
    let method = env.method.clone().unwrap_or_default();

    if !methods::is_known_method(&method) {
        session
            .send(Envelope::error_response(id, ProtocolError::method_not_found(&method)))
            .await;
        return;
    }

    if session.in_flight.load(Ordering::SeqCst) >= session.max_in_flight {
        session
            .send(Envelope::error_response(
                id,
                ProtocolError::from(CoreError::ResourceExhausted(
                    "too many in-flight requests on this connection".into(),
                )),
            ))
            .await;
        return;
    }

    session.in_flight.fetch_add(1, Ordering::SeqCst);
    let cancel = CancellationToken::new();
    session.cancellations.lock().insert(id, cancel.clone());

    let session = session.clone();
    tokio::spawn(async move {
        let deadline = Duration::from_secs(methods::default_deadline_secs(&method));
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CoreError::Cancelled(format!("{method} was cancelled"))),
            res = tokio::time::timeout(deadline, dispatch::dispatch(&session.handlers, &session.executed_by, &session.allowed_services, &method, env.params)) => {
                res.unwrap_or_else(|_| {
                    Err(CoreError::DeadlineExceeded(format!(
                        "{method} exceeded its {}s deadline",
                        deadline.as_secs()
                    )))
                })
            }
        };

        session.cancellations.lock().remove(&id);
        session.in_flight.fetch_sub(1, Ordering::SeqCst);

        let response = match outcome {
            Ok(value) => Envelope::response(id, value),
            Err(e) => Envelope::error_response(id, ProtocolError::from(e)),
        };
        session.send(response).await;
    });
}
