//! Encryption manager: the single owner of the master key
//!
//! Wraps the key in a lock so rotation can swap it atomically, and layers
//! string, object, and field-level helpers over the raw AES-256-GCM
//! primitives. Password hashing is keyed with the master key so hashes
//! from one installation are useless on another.

use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{VaultError, VaultResult};
use crate::store::KeyValueStore;

use super::encryption::{self, is_ciphertext};
use super::keys::{self, SecretKey};

/// Encryption service shared across the backup pipeline
pub struct EncryptionManager {
    kv: Arc<KeyValueStore>,
    key: RwLock<SecretKey>,
}

impl EncryptionManager {
    /// Load the persisted master key (generating one on first use)
    pub fn new(kv: Arc<KeyValueStore>) -> VaultResult<Self> {
        let key = keys::load_or_generate(&kv)?;
        Ok(Self {
            kv,
            key: RwLock::new(key),
        })
    }

    fn current_key(&self) -> VaultResult<SecretKey> {
        self.key
            .read()
            .map(|k| k.clone())
            .map_err(|e| VaultError::Storage(format!("Failed to acquire key lock: {}", e)))
    }

    /// Encrypt a string to the tagged `pv1:` form
    pub fn encrypt_str(&self, plaintext: &str) -> VaultResult<String> {
        encryption::encrypt_string(plaintext, &self.current_key()?)
    }

    /// Decrypt a tagged `pv1:` string
    pub fn decrypt_str(&self, ciphertext: &str) -> VaultResult<String> {
        encryption::decrypt_string(ciphertext, &self.current_key()?)
    }

    /// Encrypt a raw byte buffer (file contents) to the tagged form
    pub fn encrypt_bytes(&self, bytes: &[u8]) -> VaultResult<String> {
        Ok(encryption::encrypt(bytes, &self.current_key()?)?.to_compact())
    }

    /// Decrypt a tagged string back to raw bytes
    pub fn decrypt_bytes(&self, ciphertext: &str) -> VaultResult<Vec<u8>> {
        let payload = encryption::EncryptedPayload::parse(ciphertext)?;
        encryption::decrypt(&payload, &self.current_key()?)
    }

    /// Serialize a value to JSON and encrypt it
    pub fn encrypt_object<T: Serialize>(&self, value: &T) -> VaultResult<String> {
        let json = serde_json::to_string(value)?;
        self.encrypt_str(&json)
    }

    /// Decrypt and deserialize a JSON value
    pub fn decrypt_object<T: DeserializeOwned>(&self, ciphertext: &str) -> VaultResult<T> {
        let json = self.decrypt_str(ciphertext)?;
        serde_json::from_str(&json)
            .map_err(|e| VaultError::Decryption(format!("Decrypted data is not valid JSON: {}", e)))
    }

    /// Encrypt named top-level fields of a JSON object in place
    ///
    /// Non-string field values are serialized to JSON first. Fields that
    /// are absent, null, or already ciphertext are left alone.
    pub fn encrypt_fields(
        &self,
        object: &mut serde_json::Value,
        fields: &[&str],
    ) -> VaultResult<()> {
        let map = object
            .as_object_mut()
            .ok_or_else(|| VaultError::Validation("field encryption requires an object".into()))?;

        for field in fields {
            let Some(value) = map.get(*field) else { continue };
            if value.is_null() {
                continue;
            }
            let plaintext = match value.as_str() {
                Some(s) if is_ciphertext(s) => continue,
                Some(s) => s.to_string(),
                None => serde_json::to_string(value)?,
            };
            let sealed = self.encrypt_str(&plaintext)?;
            map.insert(field.to_string(), serde_json::Value::String(sealed));
        }
        Ok(())
    }

    /// Decrypt named top-level fields of a JSON object in place
    ///
    /// A field that fails to decrypt keeps its ciphertext and is reported
    /// with a warning rather than aborting the whole record. Returns the
    /// names of fields left unreadable.
    pub fn decrypt_fields(
        &self,
        object: &mut serde_json::Value,
        fields: &[&str],
    ) -> VaultResult<Vec<String>> {
        let map = object
            .as_object_mut()
            .ok_or_else(|| VaultError::Validation("field decryption requires an object".into()))?;

        let mut unreadable = Vec::new();
        for field in fields {
            let Some(ciphertext) = map.get(*field).and_then(|v| v.as_str()) else {
                continue;
            };
            if !is_ciphertext(ciphertext) {
                continue;
            }
            match self.decrypt_str(ciphertext) {
                Ok(plaintext) => {
                    // Restore structured values that were serialized on encrypt
                    let restored = serde_json::from_str(&plaintext)
                        .unwrap_or(serde_json::Value::String(plaintext));
                    map.insert(field.to_string(), restored);
                }
                Err(e) => {
                    warn!("field '{}' could not be decrypted: {}", field, e);
                    unreadable.push(field.to_string());
                }
            }
        }
        Ok(unreadable)
    }

    /// Hash a password with the master key as a pepper
    pub fn hash_password(&self, password: &str) -> VaultResult<String> {
        let key = self.current_key()?;
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(password.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Check a password against a stored hash
    pub fn verify_password(&self, password: &str, hash: &str) -> VaultResult<bool> {
        Ok(self.hash_password(password)? == hash)
    }

    /// Round-trip sanity check of the loaded key
    pub fn validate_key(&self) -> VaultResult<()> {
        let probe = "posvault-key-check";
        let sealed = self.encrypt_str(probe)?;
        if self.decrypt_str(&sealed)? != probe {
            return Err(VaultError::Encryption(
                "key validation round-trip mismatch".to_string(),
            ));
        }
        Ok(())
    }

    /// Export the master key as base64 for offline safekeeping
    pub fn export_key(&self) -> VaultResult<String> {
        Ok(self.current_key()?.to_base64())
    }

    /// Replace the master key with an imported one
    ///
    /// Used when reading backups produced under a different
    /// installation's key. Data encrypted under the previous key becomes
    /// unreadable, so export the old key first.
    pub fn import_key(&self, encoded: &str) -> VaultResult<()> {
        let key = SecretKey::from_base64(encoded)?;
        self.replace_key(key)
    }

    /// Remove the persisted master key
    ///
    /// The loaded key stays in memory until the process exits; the next
    /// startup generates a fresh key. Returns whether a key was stored.
    pub fn delete_key(&self) -> VaultResult<bool> {
        keys::delete(&self.kv)
    }

    /// Generate, persist, and install a fresh master key
    ///
    /// Restricted to the crate so rotation always goes through the backup
    /// manager, which re-encrypts every stored ciphertext under the new
    /// key. Swapping the key without that pass would orphan existing data.
    pub(crate) fn generate_new_key(&self) -> VaultResult<()> {
        self.replace_key(SecretKey::generate())
    }

    fn replace_key(&self, key: SecretKey) -> VaultResult<()> {
        keys::store(&self.kv, &key)?;
        let mut guard = self
            .key
            .write()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire key lock: {}", e)))?;
        *guard = key;
        Ok(())
    }
}
