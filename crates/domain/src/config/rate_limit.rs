use serde::{Deserialize, Serialize};

/// Per-tenant REST rate limiting (ambient concern, §1A — carried regardless
/// of spec.md's Non-goals since it's infrastructure, not a scoped-out
/// feature).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "d_rps")]
    pub requests_per_second: u32,
    #[serde(default = "d_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: d_rps(),
            burst: d_burst(),
        }
    }
}

fn d_rps() -> u32 {
    20
}
fn d_burst() -> u32 {
    40
}
