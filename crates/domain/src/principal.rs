//! Tenants, API keys, and the resolved [`Principal`] used on every request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    User,
    Service,
    Agent,
}

/// An issued API key. Immutable after creation — rotation is issue+revoke,
/// never a mutation of an existing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub tenant_id: String,
    pub key_type: KeyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_key_id: Option<String>,
    pub allowed_services: Vec<String>,
    pub is_active: bool,
    /// SHA-256 digest of the secret; the plaintext key is never stored.
    pub hashed_secret: Vec<u8>,
}

/// The resolved identity of a request, produced once at connection/request
/// handshake and threaded through every subsequent operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub tenant_id: String,
    pub key_id: String,
    pub key_type: KeyType,
    pub allowed_services: Vec<String>,
    pub parent_key_id: Option<String>,
}

impl Principal {
    pub fn allows_service(&self, service: &str) -> bool {
        self.allowed_services.iter().any(|s| s == service)
    }
}
