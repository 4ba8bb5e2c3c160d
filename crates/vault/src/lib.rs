pub mod cipher;
pub mod compare;
pub mod keys;
pub mod vault;

pub use compare::{digests_match, verify_hmac_signature};
pub use vault::Vault;
