//! Per-tenant key derivation (§4.3).
//!
//! Each tenant's data-encryption key is derived from the process-wide master
//! secret via HKDF-SHA256, salted by the key version and bound to the
//! tenant id as HKDF "info" context — two tenants never share a key even
//! though they share one master secret.

use hkdf::Hkdf;
use sha2::Sha256;

pub const KEY_LEN: usize = 32;

pub fn derive_key(master_secret: &[u8], tenant_id: &str, key_version: u32) -> [u8; KEY_LEN] {
    let salt = key_version.to_be_bytes();
    let hk = Hkdf::<Sha256>::new(Some(&salt), master_secret);
    let info = format!("mcp-vault/tenant/{tenant_id}");
    let mut key = [0u8; KEY_LEN];
    hk.expand(info.as_bytes(), &mut key)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_derive_same_key() {
        let a = derive_key(b"master", "tenant-a", 1);
        let b = derive_key(b"master", "tenant-a", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn different_tenants_derive_different_keys() {
        let a = derive_key(b"master", "tenant-a", 1);
        let b = derive_key(b"master", "tenant-b", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn different_versions_derive_different_keys() {
        let v1 = derive_key(b"master", "tenant-a", 1);
        let v2 = derive_key(b"master", "tenant-a", 2);
        assert_ne!(v1, v2);
    }
}
