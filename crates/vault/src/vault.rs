//! Credential vault (§4.3): encrypts/decrypts tool credentials and webhook
//! secrets with a tenant-derived key.

use mcp_domain::error::{CoreError, Result};

use crate::cipher;
use crate::keys::{derive_key, KEY_LEN};

pub struct Vault {
    master_secret: Vec<u8>,
    key_version: u32,
}

impl Vault {
    pub fn new(master_secret: Vec<u8>, key_version: u32) -> Self {
        Self {
            master_secret,
            key_version,
        }
    }

    /// Read the master secret from the environment variable named in
    /// `VaultConfig::master_secret_env`. An empty or unset value is an error
    /// at startup — there is no dev-mode fallback for credential encryption.
    pub fn from_env(env_var: &str, key_version: u32) -> Result<Self> {
        let secret = std::env::var(env_var)
            .map_err(|_| CoreError::Internal(format!("{env_var} is not set")))?;
        if secret.is_empty() {
            return Err(CoreError::Internal(format!("{env_var} is empty")));
        }
        Ok(Self::new(secret.into_bytes(), key_version))
    }

    fn key_for(&self, tenant_id: &str, key_version: u32) -> [u8; KEY_LEN] {
        derive_key(&self.master_secret, tenant_id, key_version)
    }

    pub fn encrypt(&self, tenant_id: &str, plaintext: &[u8]) -> Vec<u8> {
        let key = self.key_for(tenant_id, self.key_version);
        cipher::seal(&key, self.key_version, plaintext)
    }

    pub fn decrypt(&self, tenant_id: &str, envelope: &[u8]) -> Result<Vec<u8>> {
        let key_version = cipher::envelope_key_version(envelope)
            .ok_or_else(|| CoreError::Internal("credential envelope is empty".into()))?;
        let key = self.key_for(tenant_id, key_version);
        cipher::open(&key, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> Vault {
        Vault::new(b"process-wide-master-secret".to_vec(), 1)
    }

    #[test]
    fn round_trips_for_same_tenant() {
        let v = vault();
        let sealed = v.encrypt("tenant-a", b"gh_token_abc123");
        let opened = v.decrypt("tenant-a", &sealed).unwrap();
        assert_eq!(opened, b"gh_token_abc123");
    }

    #[test]
    fn cross_tenant_decrypt_is_rejected() {
        let v = vault();
        let sealed = v.encrypt("tenant-a", b"gh_token_abc123");
        let err = v.decrypt("tenant-b", &sealed).unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::PermissionDenied);
    }

    #[test]
    fn from_env_rejects_missing_var() {
        let err = Vault::from_env("MCP_VAULT_TEST_DOES_NOT_EXIST", 1).unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::Internal);
    }
}
