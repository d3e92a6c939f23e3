//! User settings for posvault
//!
//! Manages store profile information and the backup scheduling policy.
//! The backup settings are also mirrored into the `settings` collection so
//! the Backup Manager can pick them up at init time.

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::error::VaultError;

/// Backup scheduling and retention settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Whether the periodic auto-backup timer is armed
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minutes between automatic backups
    #[serde(default = "default_frequency")]
    pub frequency_minutes: u64,

    /// Retention ceiling: maximum number of backup snapshots kept
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_frequency() -> u64 {
    30
}

fn default_max_backups() -> usize {
    10
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            frequency_minutes: default_frequency(),
            max_backups: default_max_backups(),
        }
    }
}

/// Store profile shown on receipts and embedded in exports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreProfile {
    /// Display name of the store
    #[serde(default)]
    pub name: String,

    /// Street address
    #[serde(default)]
    pub address: String,

    /// Contact phone number
    #[serde(default)]
    pub phone: String,
}

/// User settings for posvault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Store profile information
    #[serde(default)]
    pub store: StoreProfile,

    /// Backup scheduling policy
    #[serde(default)]
    pub backup: BackupSettings,

    /// Default currency symbol
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Default sales tax rate in basis points (e.g. 825 = 8.25%)
    #[serde(default)]
    pub tax_rate_bps: u32,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "$".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            store: StoreProfile::default(),
            backup: BackupSettings::default(),
            currency_symbol: default_currency(),
            tax_rate_bps: 0,
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, VaultError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents)
                .map_err(|e| VaultError::Config(format!("Failed to parse settings file: {}", e)))?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> Result<(), VaultError> {
        paths.ensure_directories()?;

        let settings_path = paths.settings_file();
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| VaultError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(&settings_path, contents)
            .map_err(|e| VaultError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
