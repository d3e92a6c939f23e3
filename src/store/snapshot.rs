//! Snapshot and export file shapes
//!
//! A snapshot is one JSON array per collection plus the key-value mirror
//! under the `localStorage` key. Export files wrap the same shape in a
//! `metadata` block for portable transfer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

use super::kv::SECRET_PREFIX;

/// Snapshot key the flat key-value mirror is stored under
pub const KV_MIRROR_KEY: &str = "localStorage";

/// Export metadata `type` tag for settings-only exports
pub const SETTINGS_ONLY: &str = "settings_only";

/// Point-in-time copy of every collection plus the key-value mirror
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub BTreeMap<String, serde_json::Value>);

impl Snapshot {
    /// Store a collection's records under its name
    pub fn insert_collection<T: Serialize>(
        &mut self,
        name: &str,
        records: &[T],
    ) -> VaultResult<()> {
        let value = serde_json::to_value(records)?;
        self.0.insert(name.to_string(), value);
        Ok(())
    }

    /// Store the key-value mirror
    ///
    /// Entries under the reserved secret prefix hold key material and
    /// are dropped; a snapshot must stay restorable on an installation
    /// with a different master key, and a plaintext export must never
    /// carry the key that sealed the backups.
    pub fn insert_kv_mirror(&mut self, entries: &BTreeMap<String, String>) -> VaultResult<()> {
        let mirrored: BTreeMap<&String, &String> = entries
            .iter()
            .filter(|(key, _)| !key.starts_with(SECRET_PREFIX))
            .collect();
        let value = serde_json::to_value(mirrored)?;
        self.0.insert(KV_MIRROR_KEY.to_string(), value);
        Ok(())
    }

    /// The key-value mirror, if present
    pub fn kv_mirror(&self) -> Option<BTreeMap<String, String>> {
        let value = self.0.get(KV_MIRROR_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Parse a snapshot out of a raw JSON value
    ///
    /// The value must be an object; anything else is a corruption signal.
    pub fn from_value(value: serde_json::Value) -> VaultResult<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(VaultError::Validation(format!(
                "snapshot must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Check that every required collection is present as an array
    ///
    /// Empty arrays are fine; a missing key or a non-array value means the
    /// snapshot is corrupt or was encrypted under a different key.
    pub fn validate_required(&self, required: &[&str]) -> VaultResult<()> {
        let mut missing = Vec::new();
        for name in required {
            match self.0.get(*name) {
                Some(serde_json::Value::Array(_)) => {}
                _ => missing.push(*name),
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(VaultError::Validation(format!(
                "snapshot is missing required collections: {}",
                missing.join(", ")
            )))
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Metadata block at the top of an export file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// When the export was produced
    pub export_date: DateTime<Utc>,
    /// Export format version
    pub version: u32,
    /// Producing system tag
    pub system: String,
    /// Optional subset tag (e.g. `settings_only`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ExportMetadata {
    /// Metadata for a full export
    pub fn full() -> Self {
        Self {
            export_date: Utc::now(),
            version: 1,
            system: "posvault".to_string(),
            kind: None,
        }
    }

    /// Metadata for a settings-only export
    pub fn settings_only() -> Self {
        Self {
            kind: Some(SETTINGS_ONLY.to_string()),
            ..Self::full()
        }
    }
}

/// Portable export file: metadata block plus one key per collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFile {
    pub metadata: ExportMetadata,
    #[serde(flatten)]
    pub data: Snapshot,
}
