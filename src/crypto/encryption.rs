//! AES-256-GCM encryption/decryption
//!
//! Provides authenticated encryption for backups and sensitive fields.
//! Each encryption operation generates a unique nonce, and ciphertext is
//! carried as a single tagged string so it can live inside JSON records.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

use crate::error::{VaultError, VaultResult};

use super::SecretKey;

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Prefix tagging a string as version-1 ciphertext
const CIPHERTEXT_PREFIX: &str = "pv1:";

/// A single encrypted value: nonce and ciphertext, both base64
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// The nonce used for this encryption (base64 encoded)
    pub nonce: String,
    /// The encrypted ciphertext with authentication tag (base64 encoded)
    pub ciphertext: String,
}

impl EncryptedPayload {
    fn new(nonce: &[u8], ciphertext: &[u8]) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine};
        Self {
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        }
    }

    /// Render as a tagged single-string form, `pv1:<nonce>:<ciphertext>`
    pub fn to_compact(&self) -> String {
        format!("{}{}:{}", CIPHERTEXT_PREFIX, self.nonce, self.ciphertext)
    }

    /// Parse the tagged single-string form
    pub fn parse(s: &str) -> VaultResult<Self> {
        let rest = s.strip_prefix(CIPHERTEXT_PREFIX).ok_or_else(|| {
            VaultError::Decryption("value is not tagged ciphertext".to_string())
        })?;
        let (nonce, ciphertext) = rest.split_once(':').ok_or_else(|| {
            VaultError::Decryption("malformed ciphertext: missing nonce separator".to_string())
        })?;
        Ok(Self {
            nonce: nonce.to_string(),
            ciphertext: ciphertext.to_string(),
        })
    }

    fn decode_nonce(&self) -> VaultResult<Vec<u8>> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD
            .decode(&self.nonce)
            .map_err(|e| VaultError::Decryption(format!("Invalid nonce encoding: {}", e)))
    }

    fn decode_ciphertext(&self) -> VaultResult<Vec<u8>> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD
            .decode(&self.ciphertext)
            .map_err(|e| VaultError::Decryption(format!("Invalid ciphertext encoding: {}", e)))
    }
}

/// Whether a string carries the tagged ciphertext form
pub fn is_ciphertext(s: &str) -> bool {
    s.starts_with(CIPHERTEXT_PREFIX)
}

/// Encrypt plaintext using AES-256-GCM with a fresh random nonce
pub fn encrypt(plaintext: &[u8], key: &SecretKey) -> VaultResult<EncryptedPayload> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Encryption(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedPayload::new(&nonce_bytes, &ciphertext))
}

/// Decrypt ciphertext using AES-256-GCM
///
/// Any failure, from malformed encoding to an authentication-tag
/// mismatch under the wrong key, surfaces as a `Decryption` error;
/// garbage bytes are never returned.
pub fn decrypt(payload: &EncryptedPayload, key: &SecretKey) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let nonce_bytes = payload.decode_nonce()?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(VaultError::Decryption(format!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce_bytes.len()
        )));
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = payload.decode_ciphertext()?;
    cipher.decrypt(nonce, ciphertext.as_ref()).map_err(|_| {
        VaultError::Decryption("invalid key or corrupted data".to_string())
    })
}

/// Encrypt a string to the tagged single-string form
pub fn encrypt_string(plaintext: &str, key: &SecretKey) -> VaultResult<String> {
    Ok(encrypt(plaintext.as_bytes(), key)?.to_compact())
}

/// Decrypt a tagged single-string form back to a string
pub fn decrypt_string(ciphertext: &str, key: &SecretKey) -> VaultResult<String> {
    let payload = EncryptedPayload::parse(ciphertext)?;
    let plaintext = decrypt(&payload, key)?;
    String::from_utf8(plaintext)
        .map_err(|e| VaultError::Decryption(format!("Invalid UTF-8 in decrypted data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SecretKey {
        SecretKey::generate()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = test_key();
        let plaintext = b"Hello, World!";

        let encrypted = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&encrypted, &key).unwrap();

        assert_eq!(plaintext, decrypted.as_slice());
    }

    #[test]
    fn test_compact_form_round_trip() {
        let key = test_key();

        let compact = encrypt_string("sensitive", &key).unwrap();
        assert!(is_ciphertext(&compact));
        assert!(compact.starts_with("pv1:"));

        let decrypted = decrypt_string(&compact, &key).unwrap();
        assert_eq!(decrypted, "sensitive");
    }

    #[test]
    fn test_different_nonces() {
        let key = test_key();
        let plaintext = b"Hello, World!";

        let encrypted1 = encrypt(plaintext, &key).unwrap();
        let encrypted2 = encrypt(plaintext, &key).unwrap();

        assert_ne!(encrypted1.nonce, encrypted2.nonce);
        assert_ne!(encrypted1.ciphertext, encrypted2.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails_typed() {
        let key1 = test_key();
        let key2 = test_key();

        let compact = encrypt_string("Hello, World!", &key1).unwrap();
        let err = decrypt_string(&compact, &key2).unwrap_err();
        assert!(matches!(err, VaultError::Decryption(_)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = test_key();
        let mut encrypted = encrypt(b"Hello, World!", &key).unwrap();

        use base64::{engine::general_purpose::STANDARD, Engine};
        let mut ciphertext = STANDARD.decode(&encrypted.ciphertext).unwrap();
        ciphertext[0] ^= 0xFF;
        encrypted.ciphertext = STANDARD.encode(&ciphertext);

        assert!(decrypt(&encrypted, &key).is_err());
    }

    #[test]
    fn test_not_ciphertext_rejected() {
        let key = test_key();
        let err = decrypt_string("just a plain string", &key).unwrap_err();
        assert!(matches!(err, VaultError::Decryption(_)));
        assert!(!is_ciphertext("just a plain string"));
    }

    #[test]
    fn test_empty_plaintext() {
        let key = test_key();
        let compact = encrypt_string("", &key).unwrap();
        assert_eq!(decrypt_string(&compact, &key).unwrap(), "");
    }
}
