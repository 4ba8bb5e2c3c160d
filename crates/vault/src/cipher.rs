//! AES-256-GCM envelope: `[key_version: u8][nonce: 12 bytes][ciphertext+tag]`.
//!
//! The key version travels with the ciphertext so a master-secret or
//! key-version rotation can still decrypt old rows: encryption always uses
//! the vault's current version, decryption reads whichever version the
//! envelope names.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use mcp_domain::error::CoreError;

use crate::keys::KEY_LEN;

const NONCE_LEN: usize = 12;

pub fn seal(key: &[u8; KEY_LEN], key_version: u32, plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .expect("AES-256-GCM encryption on an in-memory buffer cannot fail");

    let mut envelope = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    envelope.push(version_byte(key_version));
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);
    envelope
}

pub fn open(key: &[u8; KEY_LEN], envelope: &[u8]) -> Result<Vec<u8>, CoreError> {
    if envelope.len() < 1 + NONCE_LEN {
        return Err(CoreError::Internal("credential envelope truncated".into()));
    }
    let (nonce_bytes, ciphertext) = envelope[1..].split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CoreError::PermissionDenied("credential decryption failed".into()))
}

pub fn envelope_key_version(envelope: &[u8]) -> Option<u32> {
    envelope.first().map(|b| *b as u32)
}

fn version_byte(key_version: u32) -> u8 {
    (key_version % 256) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_key;

    #[test]
    fn round_trips() {
        let key = derive_key(b"master", "tenant-a", 1);
        let envelope = seal(&key, 1, b"super secret token");
        let opened = open(&key, &envelope).unwrap();
        assert_eq!(opened, b"super secret token");
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let key_a = derive_key(b"master", "tenant-a", 1);
        let key_b = derive_key(b"master", "tenant-b", 1);
        let envelope = seal(&key_a, 1, b"secret");
        assert!(open(&key_b, &envelope).is_err());
    }

    #[test]
    fn envelope_carries_key_version() {
        let key = derive_key(b"master", "tenant-a", 3);
        let envelope = seal(&key, 3, b"x");
        assert_eq!(envelope_key_version(&envelope), Some(3));
    }
}
