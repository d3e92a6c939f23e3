//! Master key generation and persistence
//!
//! The 256-bit master key is generated once, stored base64-encoded in the
//! key-value store, and kept identical across reopens so existing
//! ciphertext stays readable. Changing it is key rotation, which only the
//! backup manager may perform because every encrypted value must be
//! rewritten under the new key.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{VaultError, VaultResult};
use crate::store::KeyValueStore;

/// Key-value entry holding the base64 master key
///
/// Lives under the store's reserved `crypto.` prefix, which snapshots
/// and exports never mirror.
pub const KEY_STORAGE_KEY: &str = "crypto.master_key";

/// A 256-bit master key, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as base64 for storage or export
    pub fn to_base64(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD.encode(self.0)
    }

    /// Parse a base64 key, rejecting anything that is not 32 bytes
    pub fn from_base64(encoded: &str) -> VaultResult<Self> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let mut decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| VaultError::Encryption(format!("Invalid key encoding: {}", e)))?;
        if decoded.len() != 32 {
            decoded.zeroize();
            return Err(VaultError::Encryption(format!(
                "Invalid key length: expected 32 bytes, got {}",
                decoded.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Load the persisted master key, generating and storing one on first use
pub fn load_or_generate(kv: &KeyValueStore) -> VaultResult<SecretKey> {
    if let Some(encoded) = kv.get(KEY_STORAGE_KEY)? {
        return SecretKey::from_base64(&encoded);
    }
    let key = SecretKey::generate();
    kv.set(KEY_STORAGE_KEY, key.to_base64())?;
    Ok(key)
}

/// Persist a key, replacing whatever was stored
pub fn store(kv: &KeyValueStore, key: &SecretKey) -> VaultResult<()> {
    kv.set(KEY_STORAGE_KEY, key.to_base64())
}

/// Remove the persisted key; returns whether one was stored
pub fn delete(kv: &KeyValueStore) -> VaultResult<bool> {
    kv.remove(KEY_STORAGE_KEY)
}
