//! Error types for the posvault storage engine
//!
//! One thiserror enum covers the whole engine: store, crypto, and backup
//! layers all surface `VaultError` so callers handle a single taxonomy.

use thiserror::Error;

/// The main error type for posvault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// An operation was attempted before the store finished opening
    #[error("Store not initialized: {0}")]
    NotInitialized(String),

    /// Unknown collection or index name
    #[error("Schema error: {0}")]
    Schema(String),

    /// `add` on an existing primary key or unique index value
    #[error("Duplicate key in '{collection}': {key}")]
    Duplicate {
        collection: &'static str,
        key: String,
    },

    /// Write rejected due to storage limits
    #[error("Storage quota exceeded: {0}")]
    Quota(String),

    /// Encryption failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Ciphertext did not decrypt to valid data under the current key
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// A restored/imported snapshot failed structural validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// The destructive bulk-wipe operation is permanently disabled
    #[error("Operation disabled: {0}")]
    OperationDisabled(&'static str),

    /// Storage-layer errors (lock poisoning, corrupt files)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl VaultError {
    /// Create a duplicate-key error for a collection
    pub fn duplicate(collection: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            collection,
            key: key.into(),
        }
    }

    /// Create a schema error for an unknown index
    pub fn unknown_index(collection: &'static str, index: &str) -> Self {
        Self::Schema(format!(
            "collection '{}' has no index named '{}'",
            collection, index
        ))
    }

    /// Check if this is a duplicate-key error
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Check if this is a decryption failure
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption(_))
    }

    /// Check if this is a quota error
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Quota(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        // Quota exhaustion gets its own variant so the kv layer can retry
        if err.kind() == std::io::ErrorKind::StorageFull {
            Self::Quota(err.to_string())
        } else {
            Self::Io(err.to_string())
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for posvault operations
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_duplicate_error() {
        let err = VaultError::duplicate("products", "42");
        assert_eq!(err.to_string(), "Duplicate key in 'products': 42");
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_unknown_index_error() {
        let err = VaultError::unknown_index("sales", "nope");
        assert_eq!(
            err.to_string(),
            "Schema error: collection 'sales' has no index named 'nope'"
        );
    }

    #[test]
    fn test_operation_disabled_display() {
        let err = VaultError::OperationDisabled("bulk wipe is permanently disabled");
        assert!(err.to_string().contains("bulk wipe"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vault_err: VaultError = io_err.into();
        assert!(matches!(vault_err, VaultError::Io(_)));
    }
}
