//! Cryptography for posvault
//!
//! AES-256-GCM authenticated encryption over a randomly generated
//! 256-bit master key, persisted in the key-value store. Used for
//! encrypted backups, sensitive record fields, and keyed password
//! hashing.

pub mod encryption;
pub mod keys;
pub mod manager;

pub use encryption::{
    decrypt, decrypt_string, encrypt, encrypt_string, is_ciphertext, EncryptedPayload,
};
pub use keys::{SecretKey, KEY_STORAGE_KEY};
pub use manager::EncryptionManager;
