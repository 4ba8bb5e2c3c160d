use serde::{Deserialize, Serialize};

/// Store backend configuration (§6 persisted layout). The core only
/// consumes these as opaque connection strings — the concrete relational/
/// object/cache implementations are out of scope (spec §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Relational DSN. Empty = use the in-memory reference store.
    #[serde(default)]
    pub relational_dsn: String,
    #[serde(default)]
    pub object_store_bucket: String,
    #[serde(default)]
    pub object_store_region: String,
    #[serde(default)]
    pub object_store_endpoint: String,
    #[serde(default)]
    pub cache_endpoint: String,
    /// Bounded relational connection pool size.
    #[serde(default = "d_pool_size")]
    pub pool_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            relational_dsn: String::new(),
            object_store_bucket: String::new(),
            object_store_region: String::new(),
            object_store_endpoint: String::new(),
            cache_endpoint: String::new(),
            pool_size: d_pool_size(),
        }
    }
}

fn d_pool_size() -> u32 {
    10
}
