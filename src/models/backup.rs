//! Backup record model
//!
//! Backup records are created only by the backup manager and deleted only
//! by retention pruning or explicit user deletion. When `encrypted` is
//! true the plaintext `data` field is cleared and `encrypted_data` is
//! authoritative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How a backup came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    /// Created by the periodic timer
    Auto,
    /// Created by an explicit user action
    Manual,
    /// Wrapped around an imported export file
    Imported,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
            Self::Imported => write!(f, "imported"),
        }
    }
}

/// A stored backup snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Unique identifier
    pub id: String,

    /// How this backup was created
    #[serde(rename = "type")]
    pub kind: BackupKind,

    /// When the snapshot was taken
    pub date: DateTime<Utc>,

    /// Plaintext snapshot; cleared once the record is encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Whether `encrypted_data` is authoritative
    #[serde(default)]
    pub encrypted: bool,

    /// Ciphertext of the snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_data: Option<String>,
}

impl BackupRecord {
    /// Create a fresh plaintext backup record around a snapshot value
    pub fn new(kind: BackupKind, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            date: Utc::now(),
            data: Some(data),
            encrypted: false,
            encrypted_data: None,
        }
    }

    /// Replace the plaintext snapshot with its ciphertext
    pub fn seal(&mut self, ciphertext: String) {
        self.data = None;
        self.encrypted = true;
        self.encrypted_data = Some(ciphertext);
    }

    /// Approximate stored size in bytes (ciphertext or plaintext)
    pub fn size_bytes(&self) -> usize {
        if let Some(ct) = &self.encrypted_data {
            ct.len()
        } else {
            self.data
                .as_ref()
                .map(|d| d.to_string().len())
                .unwrap_or(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_backup_is_plaintext() {
        let record = BackupRecord::new(BackupKind::Manual, json!({"products": []}));
        assert!(!record.encrypted);
        assert!(record.data.is_some());
        assert!(record.encrypted_data.is_none());
    }

    #[test]
    fn test_seal_clears_plaintext() {
        let mut record = BackupRecord::new(BackupKind::Auto, json!({"products": []}));
        record.seal("ciphertext".into());

        assert!(record.encrypted);
        assert!(record.data.is_none());
        assert_eq!(record.encrypted_data.as_deref(), Some("ciphertext"));
    }

    #[test]
    fn test_kind_serializes_as_type_tag() {
        let record = BackupRecord::new(BackupKind::Imported, json!({}));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"type\":\"imported\""));
    }

    #[test]
    fn test_size_bytes() {
        let mut record = BackupRecord::new(BackupKind::Manual, json!({"a": 1}));
        assert!(record.size_bytes() > 0);
        record.seal("abcd".into());
        assert_eq!(record.size_bytes(), 4);
    }
}
