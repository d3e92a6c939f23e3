//! Top-level service object
//!
//! One `Vault` owns the three managers and is constructed once at process
//! start; callers reach storage, encryption, and backups through it
//! instead of through process-wide globals.

use std::sync::Arc;

use crate::backup::BackupManager;
use crate::config::paths::VaultPaths;
use crate::crypto::EncryptionManager;
use crate::error::VaultResult;
use crate::store::Store;

/// The assembled storage, encryption, and backup services
pub struct Vault {
    store: Arc<Store>,
    crypto: Arc<EncryptionManager>,
    backups: Arc<BackupManager>,
}

impl Vault {
    /// Open a vault at the given paths
    ///
    /// Initializes the store, loads or generates the master key, loads
    /// backup settings, runs one retention pass, and arms the automatic
    /// backup timer when enabled.
    pub fn open(paths: VaultPaths) -> VaultResult<Self> {
        let store = Arc::new(Store::new(paths));
        store.init()?;

        let crypto = Arc::new(EncryptionManager::new(Arc::clone(store.key_value()))?);
        let backups = Arc::new(BackupManager::new(Arc::clone(&store), Arc::clone(&crypto)));
        backups.init()?;

        Ok(Self {
            store,
            crypto,
            backups,
        })
    }

    /// Open at the default (or environment-overridden) data directory
    pub fn open_default() -> VaultResult<Self> {
        Self::open(VaultPaths::new()?)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn crypto(&self) -> &Arc<EncryptionManager> {
        &self.crypto
    }

    pub fn backups(&self) -> &Arc<BackupManager> {
        &self.backups
    }

    /// Disarm the backup timer; dropping the vault does this too
    pub fn close(&self) {
        self.backups.stop_auto_backup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::BackupSettings;
    use crate::models::{Product, Setting};
    use tempfile::TempDir;

    fn open_quiet(temp: &TempDir) -> Vault {
        let paths = VaultPaths::with_base_dir(temp.path().to_path_buf());
        // Pre-disable the timer so tests stay single-threaded
        {
            let store = Store::new(paths.clone());
            let settings = BackupSettings {
                enabled: false,
                ..BackupSettings::default()
            };
            store
                .settings()
                .unwrap()
                .update(Setting::new("backup", &settings).unwrap())
                .unwrap();
        }
        Vault::open(paths).unwrap()
    }

    #[test]
    fn test_open_wires_the_managers_together() {
        let temp = TempDir::new().unwrap();
        let vault = open_quiet(&temp);

        vault
            .store()
            .products()
            .unwrap()
            .add(Product::new(1, "Coffee", "Beverages", 450))
            .unwrap();

        let record = vault.backups().create_manual_backup().unwrap();
        assert!(record.encrypted);

        vault.store().products().unwrap().delete(&1).unwrap();
        vault.backups().restore_backup(&record.id).unwrap();
        assert_eq!(vault.store().products().unwrap().count().unwrap(), 1);
    }

    #[test]
    fn test_key_survives_reopen() {
        let temp = TempDir::new().unwrap();

        let sealed = {
            let vault = open_quiet(&temp);
            vault.crypto().encrypt_str("persists").unwrap()
        };

        let vault = open_quiet(&temp);
        assert_eq!(vault.crypto().decrypt_str(&sealed).unwrap(), "persists");
    }
}
