//! Tool execution audit trail.

use crate::param::ParamValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Timeout,
    Retrying,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub id: String,
    pub tool_config_id: String,
    pub tenant_id: String,
    pub action: String,
    #[serde(skip)]
    pub parameters: Option<ParamValue>,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub retry_count: u32,
    pub response_time_ms: u64,
    pub executed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub executed_by: String,
    pub correlation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRetry {
    pub id: String,
    pub execution_id: String,
    pub attempt: u32,
    pub delay_ms: u64,
    pub error: String,
    pub attempted_at: DateTime<Utc>,
}

/// A single call within a batch (§4.6 `ExecuteBatch`).
#[derive(Debug, Clone)]
pub struct BatchCall {
    pub tool_id: String,
    pub action: String,
    pub parameters: ParamValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchCallResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub results: Vec<BatchCallResult>,
    pub success_count: u32,
    pub error_count: u32,
    pub duration_ms: u64,
    pub mode: BatchMode,
}
