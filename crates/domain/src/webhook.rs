//! Inbound webhook events (§4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventStatus {
    Pending,
    Processing,
    Processed,
    Failed,
    Ignored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub tool_id: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    pub payload: serde_json::Value,
    pub headers: HashMap<String, String>,
    pub source_ip: String,
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    pub status: WebhookEventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Count of failed processing attempts; moved to the dead-letter table
    /// once this exceeds the configured threshold (§9 open-question decision).
    pub failure_count: u32,
}

/// Default webhook dedup window (§9: 5 minutes, per-tool overridable).
pub const DEFAULT_DEDUP_WINDOW_SECS: u64 = 300;

/// Default dead-letter threshold on total failed processing attempts.
pub const DEFAULT_DLQ_THRESHOLD: u32 = 5;
