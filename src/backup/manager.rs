//! Backup manager: scheduling, retention, encrypted snapshots, restore
//!
//! Orchestrates the Store Manager and Encryption Manager: periodic and
//! on-demand snapshots are encrypted and persisted into the `backups`
//! collection, pruned against a retention ceiling, and restored through a
//! decrypt-then-validate-then-apply sequence so nothing live is touched
//! until the snapshot has proven readable and complete.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::settings::BackupSettings;
use crate::crypto::EncryptionManager;
use crate::error::{VaultError, VaultResult};
use crate::models::{BackupKind, BackupRecord, Setting};
use crate::store::{
    ExportFile, ExportMetadata, RestoreSummary, Snapshot, Store, REQUIRED_COLLECTIONS,
};

use super::restore::{validate_snapshot, BackupValidation};
use super::scheduler::Scheduler;

/// Settings-collection key holding the persisted `BackupSettings`
const BACKUP_SETTINGS_KEY: &str = "backup";

/// Summary counters for the backup subsystem
#[derive(Debug, Clone)]
pub struct BackupStats {
    /// Number of stored backup records
    pub total: usize,
    /// Approximate bytes across all stored snapshots
    pub total_size_bytes: usize,
    /// Most recent backup timestamp
    pub last_backup: Option<DateTime<Utc>>,
    /// Current scheduling and retention settings
    pub settings: BackupSettings,
    /// Whether the auto-backup timer is armed
    pub auto_backup_running: bool,
}

/// Coordinates snapshot creation, encryption, retention, and restore
pub struct BackupManager {
    store: Arc<Store>,
    crypto: Arc<EncryptionManager>,
    settings: RwLock<BackupSettings>,
    // Mutual exclusion between the timer, manual triggers, restore, and
    // key rotation. A boolean flag would let two callers pass the check
    // in the same instant.
    inflight: Mutex<()>,
    scheduler: Scheduler,
}

impl BackupManager {
    pub fn new(store: Arc<Store>, crypto: Arc<EncryptionManager>) -> Self {
        Self {
            store,
            crypto,
            settings: RwLock::new(BackupSettings::default()),
            inflight: Mutex::new(()),
            scheduler: Scheduler::new(),
        }
    }

    /// Load persisted settings, run one retention pass, and arm the timer
    /// if enabled
    pub fn init(self: &Arc<Self>) -> VaultResult<()> {
        self.store.init()?;

        let settings = self.load_settings()?;
        let enabled = settings.enabled;
        self.write_settings(settings)?;

        self.cleanup_old_backups()?;
        if enabled {
            self.start_auto_backup()?;
        }
        Ok(())
    }

    fn load_settings(&self) -> VaultResult<BackupSettings> {
        let stored = self
            .store
            .settings()?
            .get(&BACKUP_SETTINGS_KEY.to_string())?;
        match stored {
            Some(setting) => setting.parse().map_err(|e| {
                VaultError::Config(format!("Invalid backup settings: {}", e))
            }),
            None => Ok(BackupSettings::default()),
        }
    }

    fn read_settings(&self) -> VaultResult<BackupSettings> {
        self.settings
            .read()
            .map(|s| s.clone())
            .map_err(|e| VaultError::Storage(format!("Failed to read backup settings: {}", e)))
    }

    fn write_settings(&self, settings: BackupSettings) -> VaultResult<()> {
        let mut guard = self
            .settings
            .write()
            .map_err(|e| VaultError::Storage(format!("Failed to update backup settings: {}", e)))?;
        *guard = settings;
        Ok(())
    }

    /// Persist new settings and rearm or disarm the timer accordingly
    pub fn update_settings(self: &Arc<Self>, settings: BackupSettings) -> VaultResult<()> {
        let record = Setting::new(BACKUP_SETTINGS_KEY, &settings)?;
        self.store.settings()?.update(record)?;

        let enabled = settings.enabled;
        self.write_settings(settings)?;
        if enabled {
            self.start_auto_backup()?;
        } else {
            self.stop_auto_backup();
        }
        Ok(())
    }

    /// Arm the recurring timer at the configured frequency
    pub fn start_auto_backup(self: &Arc<Self>) -> VaultResult<()> {
        let settings = self.read_settings()?;
        let interval = Duration::from_secs(settings.frequency_minutes.max(1) * 60);
        let weak = Arc::downgrade(self);
        self.scheduler.start(interval, move || {
            let Some(manager) = weak.upgrade() else { return };
            // Scheduled failures are logged, never surfaced
            match manager.create_auto_backup() {
                Ok(Some(record)) => debug!("automatic backup {} created", record.id),
                Ok(None) => debug!("automatic backup skipped, another backup in flight"),
                Err(e) => warn!("automatic backup failed: {}", e),
            }
        });
        info!(
            "automatic backups armed every {} minutes",
            settings.frequency_minutes
        );
        Ok(())
    }

    /// Disarm the recurring timer
    pub fn stop_auto_backup(&self) {
        self.scheduler.stop();
    }

    /// Timer-tick backup: skipped without error when another backup,
    /// restore, or rotation is already running
    pub fn create_auto_backup(&self) -> VaultResult<Option<BackupRecord>> {
        let guard = match self.inflight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Ok(None),
            Err(TryLockError::Poisoned(e)) => {
                return Err(VaultError::Storage(format!(
                    "Backup lock poisoned: {}",
                    e
                )))
            }
        };
        let record = self.perform_backup(BackupKind::Auto)?;
        drop(guard);
        Ok(Some(record))
    }

    /// User-triggered backup: waits for any in-flight operation to finish
    pub fn create_manual_backup(&self) -> VaultResult<BackupRecord> {
        let _guard = self.lock_inflight()?;
        self.store.init()?;
        self.perform_backup(BackupKind::Manual)
    }

    fn lock_inflight(&self) -> VaultResult<std::sync::MutexGuard<'_, ()>> {
        self.inflight
            .lock()
            .map_err(|e| VaultError::Storage(format!("Backup lock poisoned: {}", e)))
    }

    /// Snapshot, encrypt, persist, prune. Caller holds the in-flight lock.
    fn perform_backup(&self, kind: BackupKind) -> VaultResult<BackupRecord> {
        let mut record = self.store.create_backup(kind)?;

        let data = record
            .data
            .take()
            .ok_or_else(|| VaultError::Storage("snapshot record has no data".into()))?;
        let ciphertext = self.crypto.encrypt_object(&data)?;
        record.seal(ciphertext);
        self.store.backups()?.update(record.clone())?;

        let pruned = self.cleanup_old_backups()?;
        info!(
            "backup {} created ({} bytes, {} pruned)",
            record.id,
            record.size_bytes(),
            pruned
        );
        Ok(record)
    }

    /// All backup records, newest first
    pub fn list_backups(&self) -> VaultResult<Vec<BackupRecord>> {
        let mut backups = self.store.backups()?.get_all()?;
        backups.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(backups)
    }

    /// Delete one backup record; returns whether it existed
    pub fn delete_backup(&self, id: &str) -> VaultResult<bool> {
        self.store.backups()?.delete(&id.to_string())
    }

    /// Delete every backup beyond the retention ceiling, oldest first
    pub fn cleanup_old_backups(&self) -> VaultResult<usize> {
        let max_backups = self.read_settings()?.max_backups;
        let backups = self.list_backups()?;
        if backups.len() <= max_backups {
            return Ok(0);
        }

        let mut pruned = 0;
        for record in &backups[max_backups..] {
            if self.store.backups()?.delete(&record.id)? {
                pruned += 1;
            }
        }
        if pruned > 0 {
            debug!("pruned {} backups beyond ceiling of {}", pruned, max_backups);
        }
        Ok(pruned)
    }

    /// Decrypt (when sealed) and parse a record's snapshot
    fn decode_snapshot(&self, record: &BackupRecord) -> VaultResult<Snapshot> {
        let value = if record.encrypted {
            let ciphertext = record.encrypted_data.as_deref().ok_or_else(|| {
                VaultError::Validation("encrypted backup record has no ciphertext".into())
            })?;
            self.crypto.decrypt_object(ciphertext)?
        } else {
            record.data.clone().ok_or_else(|| {
                VaultError::Validation("backup record has no snapshot data".into())
            })?
        };
        Snapshot::from_value(value)
    }

    fn fetch_record(&self, id: &str) -> VaultResult<BackupRecord> {
        self.store
            .backups()?
            .get(&id.to_string())?
            .ok_or_else(|| VaultError::Validation(format!("backup '{}' not found", id)))
    }

    /// Validate a stored backup without restoring it
    ///
    /// Decryption and parse failures come back as an invalid result with
    /// the reason, not as an error.
    pub fn validate_backup(&self, id: &str) -> VaultResult<BackupValidation> {
        let record = self.fetch_record(id)?;
        let snapshot = match self.decode_snapshot(&record) {
            Ok(snapshot) => snapshot,
            Err(e) => return Ok(BackupValidation::invalid(e.to_string())),
        };

        let mut validation = validate_snapshot(&snapshot, REQUIRED_COLLECTIONS);
        validation.backup_date = Some(record.date);
        validation.was_encrypted = record.encrypted;
        Ok(validation)
    }

    /// Restore live data from a stored backup
    ///
    /// Decrypts, validates completeness, and only then overwrites the
    /// live collections. A snapshot that fails either step leaves the
    /// live data exactly as it was. The restored settings collection may
    /// carry different backup settings, so they are reloaded and the
    /// timer rearmed to match.
    pub fn restore_backup(self: &Arc<Self>, id: &str) -> VaultResult<RestoreSummary> {
        let _guard = self.lock_inflight()?;

        let record = self.fetch_record(id)?;
        let snapshot = self.decode_snapshot(&record)?;

        let validation = validate_snapshot(&snapshot, REQUIRED_COLLECTIONS);
        if !validation.is_valid {
            return Err(VaultError::Validation(
                validation
                    .error
                    .unwrap_or_else(|| "snapshot failed validation".to_string()),
            ));
        }

        let summary = self.store.restore_snapshot(&snapshot)?;

        let settings = self.load_settings()?;
        let enabled = settings.enabled;
        self.write_settings(settings)?;
        if enabled {
            self.start_auto_backup()?;
        } else {
            self.stop_auto_backup();
        }

        info!(
            "restored backup {} from {} ({} collections)",
            record.id,
            record.date,
            summary.restored.len()
        );
        Ok(summary)
    }

    /// Write one backup as a plaintext JSON export file
    ///
    /// The snapshot is decrypted first so the file is portable without
    /// this installation's key.
    pub fn export_backup(&self, id: &str, dir: Option<&Path>) -> VaultResult<PathBuf> {
        let record = self.fetch_record(id)?;
        let snapshot = self.decode_snapshot(&record)?;

        let export = ExportFile {
            metadata: ExportMetadata::full(),
            data: snapshot,
        };

        let dir = dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.store.paths().export_dir());
        fs::create_dir_all(&dir)
            .map_err(|e| VaultError::Io(format!("Failed to create export directory: {}", e)))?;

        let filename = format!(
            "posvault-backup-{}.json",
            record.date.format("%Y%m%d-%H%M%S")
        );
        let path = dir.join(filename);
        let json = serde_json::to_string_pretty(&export)?;
        fs::write(&path, json)
            .map_err(|e| VaultError::Io(format!("Failed to write export file: {}", e)))?;

        info!("exported backup {} to {}", record.id, path.display());
        Ok(path)
    }

    /// Import an exported file as a fresh `imported` backup record
    ///
    /// The parsed snapshot is validated, re-encrypted under this
    /// installation's key, and stored through the normal path so it is
    /// retained and pruned like any other backup. Nothing is restored.
    pub fn import_backup(&self, path: &Path) -> VaultResult<BackupRecord> {
        let _guard = self.lock_inflight()?;

        let contents = fs::read_to_string(path)
            .map_err(|e| VaultError::Io(format!("Failed to read import file: {}", e)))?;
        let mut value: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| VaultError::Validation(format!("Import file is not valid JSON: {}", e)))?;

        if let Some(map) = value.as_object_mut() {
            map.remove("metadata");
        }
        let snapshot = Snapshot::from_value(value)?;

        let validation = validate_snapshot(&snapshot, REQUIRED_COLLECTIONS);
        if !validation.is_valid {
            return Err(VaultError::Validation(
                validation
                    .error
                    .unwrap_or_else(|| "import file failed validation".to_string()),
            ));
        }

        let mut record =
            BackupRecord::new(BackupKind::Imported, serde_json::to_value(&snapshot)?);
        let data = record
            .data
            .take()
            .ok_or_else(|| VaultError::Storage("snapshot record has no data".into()))?;
        record.seal(self.crypto.encrypt_object(&data)?);
        self.store.backups()?.update(record.clone())?;
        self.cleanup_old_backups()?;

        info!("imported backup {} from {}", record.id, path.display());
        Ok(record)
    }

    /// Rotate the master key, re-encrypting every stored backup
    ///
    /// Every snapshot is decrypted under the old key before the new key
    /// is installed; if any are unreadable the rotation is refused and
    /// the old key stays in place. Returns the number of re-encrypted
    /// backups.
    pub fn rotate_key(&self) -> VaultResult<usize> {
        let _guard = self.lock_inflight()?;

        let records = self.store.backups()?.get_all()?;
        let mut plaintexts: Vec<(BackupRecord, serde_json::Value)> = Vec::new();
        for record in records {
            if !record.encrypted {
                continue;
            }
            let ciphertext = record.encrypted_data.as_deref().ok_or_else(|| {
                VaultError::Validation(format!(
                    "encrypted backup '{}' has no ciphertext",
                    record.id
                ))
            })?;
            let value: serde_json::Value = self.crypto.decrypt_object(ciphertext)?;
            plaintexts.push((record, value));
        }

        self.crypto.generate_new_key()?;

        let rotated = plaintexts.len();
        for (mut record, value) in plaintexts {
            record.seal(self.crypto.encrypt_object(&value)?);
            self.store.backups()?.update(record)?;
        }

        info!("master key rotated, {} backups re-encrypted", rotated);
        Ok(rotated)
    }

    /// Counters and current settings for display
    pub fn get_stats(&self) -> VaultResult<BackupStats> {
        let backups = self.list_backups()?;
        Ok(BackupStats {
            total: backups.len(),
            total_size_bytes: backups.iter().map(BackupRecord::size_bytes).sum(),
            last_backup: backups.first().map(|b| b.date),
            settings: self.read_settings()?,
            auto_backup_running: self.scheduler.is_running(),
        })
    }
}

impl Drop for BackupManager {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::VaultPaths;
    use crate::crypto::is_ciphertext;
    use crate::models::Product;
    use tempfile::TempDir;

    fn create_test_manager() -> (TempDir, Arc<Store>, Arc<BackupManager>) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let store = Arc::new(Store::new(paths));
        store.init().unwrap();
        let crypto = Arc::new(EncryptionManager::new(Arc::clone(store.key_value())).unwrap());
        let manager = Arc::new(BackupManager::new(Arc::clone(&store), crypto));
        (temp_dir, store, manager)
    }

    fn seed(store: &Store) {
        store
            .products()
            .unwrap()
            .add(Product::new(1, "Coffee", "Beverages", 450))
            .unwrap();
        store.key_value().set("store.name", "Corner Shop").unwrap();
    }

    #[test]
    fn test_manual_backup_is_sealed() {
        let (_temp, store, manager) = create_test_manager();
        seed(&store);

        let record = manager.create_manual_backup().unwrap();
        assert!(record.encrypted);
        assert!(record.data.is_none());
        assert!(is_ciphertext(record.encrypted_data.as_deref().unwrap()));

        let stored = store.backups().unwrap().get(&record.id).unwrap().unwrap();
        assert!(stored.encrypted);
    }

    #[test]
    fn test_backup_restore_round_trip() {
        let (_temp, store, manager) = create_test_manager();
        seed(&store);

        let record = manager.create_manual_backup().unwrap();

        store.products().unwrap().delete(&1).unwrap();
        store
            .products()
            .unwrap()
            .add(Product::new(2, "Tea", "Beverages", 300))
            .unwrap();
        store.key_value().set("store.name", "Renamed").unwrap();

        manager.restore_backup(&record.id).unwrap();

        let products = store.products().unwrap().get_all().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Coffee");
        assert_eq!(
            store.key_value().get("store.name").unwrap().as_deref(),
            Some("Corner Shop")
        );
    }

    #[test]
    fn test_retention_ceiling_keeps_newest() {
        let (_temp, store, manager) = create_test_manager();
        seed(&store);

        let settings = BackupSettings {
            enabled: false,
            frequency_minutes: 30,
            max_backups: 3,
        };
        manager.update_settings(settings).unwrap();

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(manager.create_manual_backup().unwrap().id);
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let remaining = manager.list_backups().unwrap();
        assert_eq!(remaining.len(), 3);

        // The three newest survive
        let remaining_ids: Vec<&str> = remaining.iter().map(|b| b.id.as_str()).collect();
        for id in &ids[2..] {
            assert!(remaining_ids.contains(&id.as_str()));
        }
        for id in &ids[..2] {
            assert!(!remaining_ids.contains(&id.as_str()));
        }
    }

    #[test]
    fn test_failed_restore_is_non_destructive() {
        let (_temp, store, manager) = create_test_manager();
        seed(&store);

        let record = manager.create_manual_backup().unwrap();

        // Corrupt the stored ciphertext
        let mut corrupted = record.clone();
        corrupted.encrypted_data = Some("pv1:AAAA:BBBB".to_string());
        store.backups().unwrap().update(corrupted).unwrap();

        let err = manager.restore_backup(&record.id).unwrap_err();
        assert!(matches!(err, VaultError::Decryption(_)));

        // Live data untouched
        let products = store.products().unwrap().get_all().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Coffee");
    }

    #[test]
    fn test_validate_backup_reports_missing_collection() {
        let (_temp, store, manager) = create_test_manager();
        seed(&store);

        let mut record = manager.create_manual_backup().unwrap();

        // Re-seal a snapshot missing the sales collection
        let mut snapshot = store.snapshot().unwrap();
        snapshot.0.remove("sales");
        let value = serde_json::to_value(&snapshot).unwrap();
        record.seal(manager.crypto.encrypt_object(&value).unwrap());
        store.backups().unwrap().update(record.clone()).unwrap();

        let validation = manager.validate_backup(&record.id).unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.missing_collections, vec!["sales".to_string()]);

        // And restore refuses it
        let err = manager.restore_backup(&record.id).unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[test]
    fn test_export_import_round_trip() {
        let (temp, store, manager) = create_test_manager();
        seed(&store);

        let record = manager.create_manual_backup().unwrap();
        let path = manager
            .export_backup(&record.id, Some(temp.path()))
            .unwrap();

        // Export file is plaintext JSON
        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert!(parsed["metadata"]["system"].is_string());
        assert!(parsed["products"].is_array());

        let imported = manager.import_backup(&path).unwrap();
        assert_eq!(imported.kind, BackupKind::Imported);
        assert!(imported.encrypted);

        // Imported records restore like any other
        store.products().unwrap().delete(&1).unwrap();
        manager.restore_backup(&imported.id).unwrap();
        assert_eq!(store.products().unwrap().count().unwrap(), 1);
    }

    #[test]
    fn test_import_rejects_incomplete_file() {
        let (temp, _store, manager) = create_test_manager();

        let path = temp.path().join("partial.json");
        std::fs::write(&path, r#"{"products": []}"#).unwrap();

        let err = manager.import_backup(&path).unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[test]
    fn test_rotate_key_keeps_backups_restorable() {
        let (_temp, store, manager) = create_test_manager();
        seed(&store);

        let record = manager.create_manual_backup().unwrap();
        let rotated = manager.rotate_key().unwrap();
        assert_eq!(rotated, 1);

        // Ciphertext changed but still decrypts and restores
        let stored = store.backups().unwrap().get(&record.id).unwrap().unwrap();
        assert_ne!(stored.encrypted_data, record.encrypted_data);

        store.products().unwrap().delete(&1).unwrap();
        manager.restore_backup(&record.id).unwrap();
        assert_eq!(store.products().unwrap().count().unwrap(), 1);
    }

    #[test]
    fn test_restore_reloads_backup_settings_and_timer() {
        let (_temp, store, manager) = create_test_manager();
        seed(&store);

        // The snapshot carries enabled settings
        let enabled = BackupSettings {
            enabled: true,
            frequency_minutes: 60,
            max_backups: 4,
        };
        store
            .settings()
            .unwrap()
            .update(Setting::new(BACKUP_SETTINGS_KEY, &enabled).unwrap())
            .unwrap();
        let record = manager.create_manual_backup().unwrap();

        // Live settings switch to disabled after the backup was taken
        let disabled = BackupSettings {
            enabled: false,
            frequency_minutes: 5,
            max_backups: 2,
        };
        manager.update_settings(disabled).unwrap();
        assert!(!manager.get_stats().unwrap().auto_backup_running);

        manager.restore_backup(&record.id).unwrap();

        let stats = manager.get_stats().unwrap();
        assert_eq!(stats.settings.frequency_minutes, 60);
        assert_eq!(stats.settings.max_backups, 4);
        assert!(stats.auto_backup_running);

        manager.stop_auto_backup();
    }

    #[test]
    fn test_auto_backup_skipped_while_busy() {
        let (_temp, _store, manager) = create_test_manager();

        let _guard = manager.inflight.lock().unwrap();
        let result = manager.create_auto_backup().unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_init_loads_persisted_settings() {
        let (_temp, store, manager) = create_test_manager();

        let settings = BackupSettings {
            enabled: false,
            frequency_minutes: 5,
            max_backups: 2,
        };
        store
            .settings()
            .unwrap()
            .update(Setting::new(BACKUP_SETTINGS_KEY, &settings).unwrap())
            .unwrap();

        manager.init().unwrap();
        let stats = manager.get_stats().unwrap();
        assert_eq!(stats.settings.frequency_minutes, 5);
        assert_eq!(stats.settings.max_backups, 2);
        assert!(!stats.auto_backup_running);
    }

    #[test]
    fn test_stats() {
        let (_temp, store, manager) = create_test_manager();
        seed(&store);

        manager.create_manual_backup().unwrap();
        manager.create_manual_backup().unwrap();

        let stats = manager.get_stats().unwrap();
        assert_eq!(stats.total, 2);
        assert!(stats.total_size_bytes > 0);
        assert!(stats.last_backup.is_some());
    }
}
