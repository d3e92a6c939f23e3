//! Store Manager: durable, queryable storage for the POS collections
//!
//! One typed `Collection` per collection name, an ambient key-value
//! mirror, and snapshot assembly/restore for the backup pipeline. The
//! store is the single owner of the on-disk representation; callers get
//! at collections through accessors that lazily initialize on first use.

pub mod collection;
pub mod file_io;
pub mod kv;
pub mod record;
pub mod snapshot;

pub use collection::Collection;
pub use kv::KeyValueStore;
pub use record::{IndexDef, Record};
pub use snapshot::{ExportFile, ExportMetadata, Snapshot, KV_MIRROR_KEY, SETTINGS_ONLY};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::config::paths::VaultPaths;
use crate::error::{VaultError, VaultResult};
use crate::models::{
    BackupKind, BackupRecord, Category, Customer, Product, ReturnRecord, Sale, Setting, Shift,
    User,
};

/// Collections every snapshot must contain
pub const REQUIRED_COLLECTIONS: &[&str] = &[
    "products",
    "categories",
    "customers",
    "sales",
    "shifts",
    "returns",
    "users",
    "settings",
];

/// What `import_data` / `restore_snapshot` did
#[derive(Debug, Default)]
pub struct RestoreSummary {
    /// Collections whose contents were replaced
    pub restored: Vec<String>,
    /// Unknown collection names skipped with a warning
    pub skipped: Vec<String>,
    /// Key-value mirror entries written
    pub kv_entries: usize,
}

/// The storage engine
pub struct Store {
    paths: VaultPaths,
    kv: Arc<KeyValueStore>,
    products: Collection<Product>,
    categories: Collection<Category>,
    customers: Collection<Customer>,
    sales: Collection<Sale>,
    shifts: Collection<Shift>,
    returns: Collection<ReturnRecord>,
    users: Collection<User>,
    settings: Collection<Setting>,
    backups: Collection<BackupRecord>,
    initialized: Mutex<bool>,
}

impl Store {
    /// Create a store rooted at the given paths; nothing is opened until
    /// `init` or the first operation
    pub fn new(paths: VaultPaths) -> Self {
        let kv = Arc::new(KeyValueStore::new(paths.key_value_file()));
        Self {
            products: Collection::new(paths.collection_file(Product::COLLECTION)),
            categories: Collection::new(paths.collection_file(Category::COLLECTION)),
            customers: Collection::new(paths.collection_file(Customer::COLLECTION)),
            sales: Collection::new(paths.collection_file(Sale::COLLECTION)),
            shifts: Collection::new(paths.collection_file(Shift::COLLECTION)),
            returns: Collection::new(paths.collection_file(ReturnRecord::COLLECTION)),
            users: Collection::new(paths.collection_file(User::COLLECTION)),
            settings: Collection::new(paths.collection_file(Setting::COLLECTION)),
            backups: Collection::new(paths.collection_file(BackupRecord::COLLECTION)),
            kv,
            paths,
            initialized: Mutex::new(false),
        }
    }

    /// Open the store: create directories and load every collection
    ///
    /// Idempotent: repeated calls reuse the loaded state and never drop
    /// or duplicate records. A collection whose file is missing loads
    /// empty, which is how new collections are added without touching
    /// existing ones.
    pub fn init(&self) -> VaultResult<()> {
        let mut initialized = self
            .initialized
            .lock()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire init lock: {}", e)))?;
        if *initialized {
            return Ok(());
        }

        self.paths.ensure_directories()?;

        self.products.load()?;
        self.categories.load()?;
        self.customers.load()?;
        self.sales.load()?;
        self.shifts.load()?;
        self.returns.load()?;
        self.users.load()?;
        self.settings.load()?;
        self.backups.load()?;

        *initialized = true;
        info!("store initialized at {}", self.paths.base_dir().display());
        Ok(())
    }

    /// Lazy-init guard used by every accessor
    ///
    /// An operation that could not open the store surfaces as
    /// `NotInitialized` with the underlying cause.
    fn ensure_init(&self) -> VaultResult<()> {
        self.init()
            .map_err(|e| VaultError::NotInitialized(e.to_string()))
    }

    /// Create data files for any collection missing on disk
    pub fn ensure_stores_exist(&self) -> VaultResult<()> {
        self.ensure_init()?;
        self.products.ensure_file()?;
        self.categories.ensure_file()?;
        self.customers.ensure_file()?;
        self.sales.ensure_file()?;
        self.shifts.ensure_file()?;
        self.returns.ensure_file()?;
        self.users.ensure_file()?;
        self.settings.ensure_file()?;
        self.backups.ensure_file()?;
        Ok(())
    }

    /// Path configuration
    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    /// The ambient key-value mirror
    pub fn key_value(&self) -> &Arc<KeyValueStore> {
        &self.kv
    }

    // Collection accessors, lazily initializing on first use.

    pub fn products(&self) -> VaultResult<&Collection<Product>> {
        self.ensure_init()?;
        Ok(&self.products)
    }

    pub fn categories(&self) -> VaultResult<&Collection<Category>> {
        self.ensure_init()?;
        Ok(&self.categories)
    }

    pub fn customers(&self) -> VaultResult<&Collection<Customer>> {
        self.ensure_init()?;
        Ok(&self.customers)
    }

    pub fn sales(&self) -> VaultResult<&Collection<Sale>> {
        self.ensure_init()?;
        Ok(&self.sales)
    }

    pub fn shifts(&self) -> VaultResult<&Collection<Shift>> {
        self.ensure_init()?;
        Ok(&self.shifts)
    }

    pub fn returns(&self) -> VaultResult<&Collection<ReturnRecord>> {
        self.ensure_init()?;
        Ok(&self.returns)
    }

    pub fn users(&self) -> VaultResult<&Collection<User>> {
        self.ensure_init()?;
        Ok(&self.users)
    }

    pub fn settings(&self) -> VaultResult<&Collection<Setting>> {
        self.ensure_init()?;
        Ok(&self.settings)
    }

    pub fn backups(&self) -> VaultResult<&Collection<BackupRecord>> {
        self.ensure_init()?;
        Ok(&self.backups)
    }

    /// Assemble a full snapshot of every required collection plus the
    /// key-value mirror
    ///
    /// Collections are read sequentially without a global lock, so a
    /// record written while the snapshot is in progress may or may not be
    /// included. The backups collection itself is excluded to keep
    /// snapshots from compounding.
    pub fn snapshot(&self) -> VaultResult<Snapshot> {
        self.ensure_init()?;

        let mut snapshot = Snapshot::default();
        snapshot.insert_collection(Product::COLLECTION, &self.products.get_all()?)?;
        snapshot.insert_collection(Category::COLLECTION, &self.categories.get_all()?)?;
        snapshot.insert_collection(Customer::COLLECTION, &self.customers.get_all()?)?;
        snapshot.insert_collection(Sale::COLLECTION, &self.sales.get_all()?)?;
        snapshot.insert_collection(Shift::COLLECTION, &self.shifts.get_all()?)?;
        snapshot.insert_collection(ReturnRecord::COLLECTION, &self.returns.get_all()?)?;
        snapshot.insert_collection(User::COLLECTION, &self.users.get_all()?)?;
        snapshot.insert_collection(Setting::COLLECTION, &self.settings.get_all()?)?;
        snapshot.insert_kv_mirror(&self.kv.entries()?)?;
        Ok(snapshot)
    }

    /// Take a snapshot, persist it as an unencrypted backup record, and
    /// return it
    ///
    /// Encryption is layered on by the backup manager.
    pub fn create_backup(&self, kind: BackupKind) -> VaultResult<BackupRecord> {
        let snapshot = self.snapshot()?;
        let record = BackupRecord::new(kind, serde_json::to_value(&snapshot)?);
        self.backups.update(record.clone())?;
        Ok(record)
    }

    /// Replace live collection contents from a snapshot
    ///
    /// Each collection is cleared and bulk-inserted in its own write pass
    /// and the key-value mirror entries are written individually; a
    /// failure partway through leaves earlier collections restored and
    /// later ones untouched. Unknown collection names are skipped with a
    /// warning to tolerate schema drift.
    pub fn restore_snapshot(&self, snapshot: &Snapshot) -> VaultResult<RestoreSummary> {
        self.ensure_init()?;

        let mut summary = RestoreSummary::default();
        for (name, value) in &snapshot.0 {
            if name == KV_MIRROR_KEY {
                continue;
            }
            if self.restore_collection(name, value)? {
                summary.restored.push(name.clone());
            } else {
                warn!("skipping unknown collection '{}' in snapshot", name);
                summary.skipped.push(name.clone());
            }
        }

        if let Some(entries) = snapshot.kv_mirror() {
            for (key, value) in &entries {
                // Key material never travels with a snapshot; an entry
                // under the reserved prefix came from an older or
                // foreign file and must not clobber the installed key.
                if key.starts_with(kv::SECRET_PREFIX) {
                    warn!("skipping reserved key-value entry '{}' in snapshot", key);
                    continue;
                }
                self.kv.set(key.clone(), value.clone())?;
                summary.kv_entries += 1;
            }
        }

        Ok(summary)
    }

    /// Restore a single known collection; returns false for unknown names
    fn restore_collection(&self, name: &str, value: &serde_json::Value) -> VaultResult<bool> {
        macro_rules! apply {
            ($collection:expr, $ty:ty) => {{
                let records: Vec<$ty> = serde_json::from_value(value.clone()).map_err(|e| {
                    VaultError::Validation(format!("collection '{}' is malformed: {}", name, e))
                })?;
                $collection.replace_all(records)?;
                Ok(true)
            }};
        }

        match name {
            "products" => apply!(self.products, Product),
            "categories" => apply!(self.categories, Category),
            "customers" => apply!(self.customers, Customer),
            "sales" => apply!(self.sales, Sale),
            "shifts" => apply!(self.shifts, Shift),
            "returns" => apply!(self.returns, ReturnRecord),
            "users" => apply!(self.users, User),
            "settings" => apply!(self.settings, Setting),
            "backups" => apply!(self.backups, BackupRecord),
            _ => Ok(false),
        }
    }

    /// Restore from a stored plaintext backup record
    ///
    /// Encrypted records must go through the backup manager, which
    /// decrypts and validates before calling `restore_snapshot`.
    pub fn restore_backup(&self, id: &str) -> VaultResult<RestoreSummary> {
        let record = self
            .backups()?
            .get(&id.to_string())?
            .ok_or_else(|| VaultError::Validation(format!("backup '{}' not found", id)))?;

        if record.encrypted {
            return Err(VaultError::Validation(
                "backup is encrypted; restore it through the backup manager".into(),
            ));
        }
        let data = record
            .data
            .ok_or_else(|| VaultError::Validation("backup record has no snapshot data".into()))?;
        let snapshot = Snapshot::from_value(data)?;
        snapshot.validate_required(REQUIRED_COLLECTIONS)?;
        self.restore_snapshot(&snapshot)
    }

    /// Full export for portable file transfer
    pub fn export_data(&self) -> VaultResult<ExportFile> {
        Ok(ExportFile {
            metadata: ExportMetadata::full(),
            data: self.snapshot()?,
        })
    }

    /// Import a previously exported file (or any snapshot-shaped object)
    ///
    /// Unknown collection names are skipped with a warning; a
    /// `settings_only` export applies just the settings collection and
    /// the key-value mirror.
    pub fn import_data(&self, mut value: serde_json::Value) -> VaultResult<RestoreSummary> {
        let metadata = value
            .as_object_mut()
            .ok_or_else(|| VaultError::Validation("import data must be a JSON object".into()))?
            .remove("metadata");

        let settings_only = metadata
            .as_ref()
            .and_then(|m| m.get("type"))
            .and_then(|t| t.as_str())
            .is_some_and(|t| t == SETTINGS_ONLY);

        let mut snapshot = Snapshot::from_value(value)?;
        if settings_only {
            snapshot
                .0
                .retain(|name, _| name == Setting::COLLECTION || name == KV_MIRROR_KEY);
        }
        self.restore_snapshot(&snapshot)
    }

    /// Settings-only export
    pub fn export_settings(&self) -> VaultResult<ExportFile> {
        self.ensure_init()?;

        let mut data = Snapshot::default();
        data.insert_collection(Setting::COLLECTION, &self.settings.get_all()?)?;
        data.insert_kv_mirror(&self.kv.entries()?)?;
        Ok(ExportFile {
            metadata: ExportMetadata::settings_only(),
            data,
        })
    }

    /// Settings-only import
    pub fn import_settings(&self, value: serde_json::Value) -> VaultResult<RestoreSummary> {
        let mut snapshot = match value {
            serde_json::Value::Object(mut map) => {
                map.remove("metadata");
                Snapshot(map.into_iter().collect())
            }
            other => Snapshot::from_value(other)?,
        };
        snapshot
            .0
            .retain(|name, _| name == Setting::COLLECTION || name == KV_MIRROR_KEY);
        self.restore_snapshot(&snapshot)
    }

    /// Record counts per collection
    pub fn get_stats(&self) -> VaultResult<BTreeMap<&'static str, usize>> {
        self.ensure_init()?;

        let mut stats = BTreeMap::new();
        stats.insert(Product::COLLECTION, self.products.count()?);
        stats.insert(Category::COLLECTION, self.categories.count()?);
        stats.insert(Customer::COLLECTION, self.customers.count()?);
        stats.insert(Sale::COLLECTION, self.sales.count()?);
        stats.insert(Shift::COLLECTION, self.shifts.count()?);
        stats.insert(ReturnRecord::COLLECTION, self.returns.count()?);
        stats.insert(User::COLLECTION, self.users.count()?);
        stats.insert(Setting::COLLECTION, self.settings.count()?);
        stats.insert(BackupRecord::COLLECTION, self.backups.count()?);
        Ok(stats)
    }

    /// Bulk wipe of every collection. Permanently disabled as a safety
    /// rail against accidental total data loss; always fails and alters
    /// nothing.
    pub fn wipe_all_data(&self) -> VaultResult<()> {
        Err(VaultError::OperationDisabled(
            "bulk data wipe is permanently disabled",
        ))
    }
}
