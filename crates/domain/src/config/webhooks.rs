use serde::{Deserialize, Serialize};

use crate::webhook::{DEFAULT_DEDUP_WINDOW_SECS, DEFAULT_DLQ_THRESHOLD};

/// Webhook ingress defaults (§4.8). Per-tool overrides live on
/// `ToolConfiguration.webhook_config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhooksConfig {
    #[serde(default = "d_dedup_window")]
    pub dedup_window_secs: u64,
    #[serde(default = "d_dlq_threshold")]
    pub dead_letter_threshold: u32,
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: d_dedup_window(),
            dead_letter_threshold: d_dlq_threshold(),
        }
    }
}

fn d_dedup_window() -> u64 {
    DEFAULT_DEDUP_WINDOW_SECS
}
fn d_dlq_threshold() -> u32 {
    DEFAULT_DLQ_THRESHOLD
}
