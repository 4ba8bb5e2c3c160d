use serde::{Deserialize, Serialize};

/// Credential vault configuration (§4.3). The master secret itself is never
/// read from this struct — only the name of the env var holding it, so the
/// secret never round-trips through a config file or `config show` dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "d_master_secret_env")]
    pub master_secret_env: String,
    /// Current key version; new encryptions always use this version.
    #[serde(default = "d_key_version")]
    pub key_version: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            master_secret_env: d_master_secret_env(),
            key_version: d_key_version(),
        }
    }
}

fn d_master_secret_env() -> String {
    "MCP_MASTER_SECRET".into()
}
fn d_key_version() -> u32 {
    1
}
