//! Snapshot validation for restore and import
//!
//! Validation failures are reported as a structured result rather than an
//! error so callers can show the specific reason (which collection is
//! missing, whether decryption failed) before anything is overwritten.

use chrono::{DateTime, Utc};

use crate::store::Snapshot;

/// Outcome of validating a backup or import file before restore
#[derive(Debug, Clone)]
pub struct BackupValidation {
    /// Whether the snapshot may be restored
    pub is_valid: bool,
    /// Human-readable reason when invalid
    pub error: Option<String>,
    /// Required collections absent from the snapshot
    pub missing_collections: Vec<String>,
    /// When the backup was created, if known
    pub backup_date: Option<DateTime<Utc>>,
    /// Whether the stored record was encrypted
    pub was_encrypted: bool,
}

impl BackupValidation {
    /// A snapshot that passed every check
    pub fn valid(backup_date: Option<DateTime<Utc>>, was_encrypted: bool) -> Self {
        Self {
            is_valid: true,
            error: None,
            missing_collections: Vec::new(),
            backup_date,
            was_encrypted,
        }
    }

    /// A snapshot rejected for a non-structural reason (decryption,
    /// malformed JSON)
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            missing_collections: Vec::new(),
            backup_date: None,
            was_encrypted: false,
        }
    }

    /// A snapshot rejected because required collections are missing
    pub fn missing(missing: Vec<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(format!(
                "snapshot is missing required collections: {}",
                missing.join(", ")
            )),
            missing_collections: missing,
            backup_date: None,
            was_encrypted: false,
        }
    }
}

/// Check that a decrypted snapshot contains every required collection as
/// an array
///
/// Empty arrays are fine; a missing key is a corruption signal.
pub fn validate_snapshot(snapshot: &Snapshot, required: &[&str]) -> BackupValidation {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| {
            !snapshot
                .0
                .get(**name)
                .is_some_and(serde_json::Value::is_array)
        })
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        BackupValidation::valid(None, false)
    } else {
        BackupValidation::missing(missing)
    }
}
