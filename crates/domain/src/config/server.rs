use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Maximum size of a single inbound WS message (§4.7).
    #[serde(default = "d_max_message_size")]
    pub max_message_size_bytes: usize,
    /// `initialize` must arrive within this many seconds of WS upgrade.
    #[serde(default = "d_init_timeout")]
    pub init_timeout_secs: u64,
    /// WS keepalive ping interval.
    #[serde(default = "d_ping_interval")]
    pub ping_interval_secs: u64,
    /// Env var name holding the bearer token required on the REST surface
    /// and as the WS subprotocol auth parameter. Empty env var = dev mode.
    #[serde(default = "d_api_token_env")]
    pub api_token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            cors: CorsConfig::default(),
            max_message_size_bytes: d_max_message_size(),
            init_timeout_secs: d_init_timeout(),
            ping_interval_secs: d_ping_interval(),
            api_token_env: d_api_token_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed for CORS. Use `["*"]` for permissive (NOT recommended).
    /// Defaults to localhost-only.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_port() -> u16 {
    7070
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_max_message_size() -> usize {
    1024 * 1024
}
fn d_init_timeout() -> u64 {
    10
}
fn d_ping_interval() -> u64 {
    30
}
fn d_api_token_env() -> String {
    "MCP_API_TOKEN".into()
}
