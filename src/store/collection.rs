//! Generic typed collection repository
//!
//! One `Collection<R>` instance per record type. Records live in an
//! in-memory ordered map guarded by an `RwLock`; every mutation is
//! written through to the collection's JSON file atomically, which is the
//! single-collection write-transaction unit of this engine. Secondary
//! indexes are rebuilt on load and maintained on every mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

use super::file_io::{read_json, write_json_atomic};
use super::record::Record;

/// On-disk shape of a collection file
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
struct CollectionFile<R: Record> {
    records: Vec<R>,
}

impl<R: Record> Default for CollectionFile<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

/// Records plus their secondary index maps, mutated together
struct CollectionState<R: Record> {
    records: BTreeMap<R::Key, R>,
    /// index name -> index value -> keys of records carrying that value
    indexes: HashMap<&'static str, BTreeMap<String, BTreeSet<R::Key>>>,
}

impl<R: Record> CollectionState<R> {
    fn empty() -> Self {
        let mut indexes = HashMap::new();
        for def in R::indexes() {
            indexes.insert(def.name, BTreeMap::new());
        }
        Self {
            records: BTreeMap::new(),
            indexes,
        }
    }

    fn insert(&mut self, record: R) {
        let key = record.key();
        for def in R::indexes() {
            if let Some(value) = (def.key_fn)(&record) {
                self.indexes
                    .get_mut(def.name)
                    .expect("index map created at construction")
                    .entry(value)
                    .or_default()
                    .insert(key.clone());
            }
        }
        self.records.insert(key, record);
    }

    fn remove(&mut self, key: &R::Key) -> Option<R> {
        let record = self.records.remove(key)?;
        for def in R::indexes() {
            if let Some(value) = (def.key_fn)(&record) {
                if let Some(entries) = self.indexes.get_mut(def.name) {
                    if let Some(keys) = entries.get_mut(&value) {
                        keys.remove(key);
                        if keys.is_empty() {
                            entries.remove(&value);
                        }
                    }
                }
            }
        }
        Some(record)
    }

    fn replace_all(&mut self, records: Vec<R>) {
        self.records.clear();
        for entries in self.indexes.values_mut() {
            entries.clear();
        }
        for record in records {
            self.insert(record);
        }
    }
}

/// A durable, queryable collection of one record type
pub struct Collection<R: Record> {
    path: PathBuf,
    state: RwLock<CollectionState<R>>,
}

impl<R: Record> std::fmt::Debug for Collection<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<R: Record> Collection<R> {
    /// Create an empty collection backed by the given file
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: RwLock::new(CollectionState::empty()),
        }
    }

    fn read(&self) -> VaultResult<RwLockReadGuard<'_, CollectionState<R>>> {
        self.state
            .read()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> VaultResult<RwLockWriteGuard<'_, CollectionState<R>>> {
        self.state
            .write()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Persist the current state; called with the write lock held so the
    /// file always matches memory
    fn persist(&self, state: &CollectionState<R>) -> VaultResult<()> {
        let file = CollectionFile {
            records: state.records.values().cloned().collect(),
        };
        write_json_atomic(&self.path, &file)
    }

    /// Load records from disk, rebuilding the index maps
    ///
    /// A missing file loads as an empty collection; this is how a new
    /// collection gets added without touching existing ones.
    pub fn load(&self) -> VaultResult<()> {
        let file: CollectionFile<R> = read_json(&self.path)?;
        let mut state = self.write()?;
        state.replace_all(file.records);
        Ok(())
    }

    /// Whether this collection's data file exists on disk
    pub fn file_exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the data file if it is missing, without touching records
    pub fn ensure_file(&self) -> VaultResult<()> {
        if !self.file_exists() {
            let state = self.read()?;
            self.persist(&state)?;
        }
        Ok(())
    }

    /// Insert a record; fails with `Duplicate` if the primary key or any
    /// unique index value is already taken
    pub fn add(&self, record: R) -> VaultResult<()> {
        let mut state = self.write()?;
        let key = record.key();

        if state.records.contains_key(&key) {
            return Err(VaultError::duplicate(R::COLLECTION, key.to_string()));
        }
        for def in R::indexes().iter().filter(|d| d.unique) {
            if let Some(value) = (def.key_fn)(&record) {
                let taken = state
                    .indexes
                    .get(def.name)
                    .and_then(|entries| entries.get(&value))
                    .is_some_and(|keys| !keys.is_empty());
                if taken {
                    return Err(VaultError::duplicate(R::COLLECTION, value));
                }
            }
        }

        state.insert(record);
        if let Err(e) = self.persist(&state) {
            // Keep memory consistent with disk on a failed write
            state.remove(&key);
            return Err(e);
        }
        Ok(())
    }

    /// Insert or replace a record (upsert)
    pub fn update(&self, record: R) -> VaultResult<()> {
        let mut state = self.write()?;
        let key = record.key();

        let previous = state.remove(&key);
        state.insert(record);
        if let Err(e) = self.persist(&state) {
            state.remove(&key);
            if let Some(prev) = previous {
                state.insert(prev);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Delete a record by primary key; returns whether it existed
    pub fn delete(&self, key: &R::Key) -> VaultResult<bool> {
        let mut state = self.write()?;

        let Some(removed) = state.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&state) {
            state.insert(removed);
            return Err(e);
        }
        Ok(true)
    }

    /// Get a record by primary key
    pub fn get(&self, key: &R::Key) -> VaultResult<Option<R>> {
        let state = self.read()?;
        Ok(state.records.get(key).cloned())
    }

    /// Get all records, in storage (key) order
    pub fn get_all(&self) -> VaultResult<Vec<R>> {
        let state = self.read()?;
        Ok(state.records.values().cloned().collect())
    }

    /// Exact-match query against a declared secondary index
    pub fn search(&self, index: &str, value: &str) -> VaultResult<Vec<R>> {
        let state = self.read()?;
        let entries = state
            .indexes
            .get(index)
            .ok_or_else(|| VaultError::unknown_index(R::COLLECTION, index))?;

        let mut results = Vec::new();
        if let Some(keys) = entries.get(value) {
            for key in keys {
                if let Some(record) = state.records.get(key) {
                    results.push(record.clone());
                }
            }
        }
        Ok(results)
    }

    /// Inclusive range query against a declared secondary index, in index
    /// order
    pub fn get_by_range(&self, index: &str, start: &str, end: &str) -> VaultResult<Vec<R>> {
        let state = self.read()?;
        let entries = state
            .indexes
            .get(index)
            .ok_or_else(|| VaultError::unknown_index(R::COLLECTION, index))?;

        let mut results = Vec::new();
        for (_, keys) in entries.range(start.to_string()..=end.to_string()) {
            for key in keys {
                if let Some(record) = state.records.get(key) {
                    results.push(record.clone());
                }
            }
        }
        Ok(results)
    }

    /// Replace the entire collection contents (clear, then bulk insert)
    pub fn replace_all(&self, records: Vec<R>) -> VaultResult<()> {
        let mut state = self.write()?;
        state.replace_all(records);
        self.persist(&state)
    }

    /// Record count
    pub fn count(&self) -> VaultResult<usize> {
        let state = self.read()?;
        Ok(state.records.len())
    }
}

impl<R: Record<Key = u64>> Collection<R> {
    /// Next free numeric id (max + 1)
    pub fn next_id(&self) -> VaultResult<u64> {
        let state = self.read()?;
        Ok(state.records.keys().next_back().map_or(1, |max| max + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, Sale, SaleItem};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn create_test_collection() -> (TempDir, Collection<Product>) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("products.json");
        let collection = Collection::new(path);
        collection.load().unwrap();
        (temp_dir, collection)
    }

    #[test]
    fn test_add_and_get() {
        let (_temp, products) = create_test_collection();

        products.add(Product::new(1, "Coffee", "Beverages", 450)).unwrap();

        let found = products.get(&1).unwrap().unwrap();
        assert_eq!(found.name, "Coffee");
        assert!(products.get(&2).unwrap().is_none());
    }

    #[test]
    fn test_add_duplicate_primary_key_fails() {
        let (_temp, products) = create_test_collection();

        products.add(Product::new(1, "Coffee", "Beverages", 450)).unwrap();
        let err = products
            .add(Product::new(1, "Other", "Misc", 100))
            .unwrap_err();

        assert!(err.is_duplicate());
        // First record untouched
        assert_eq!(products.get(&1).unwrap().unwrap().name, "Coffee");
    }

    #[test]
    fn test_add_duplicate_unique_index_fails() {
        let (_temp, products) = create_test_collection();

        products
            .add(Product::new(1, "Coffee", "Beverages", 450).with_barcode("111"))
            .unwrap();
        let err = products
            .add(Product::new(2, "Tea", "Beverages", 300).with_barcode("111"))
            .unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(products.count().unwrap(), 1);
    }

    #[test]
    fn test_update_upserts() {
        let (_temp, products) = create_test_collection();

        products.update(Product::new(1, "Coffee", "Beverages", 450)).unwrap();
        products.update(Product::new(1, "Coffee XL", "Beverages", 550)).unwrap();

        let found = products.get(&1).unwrap().unwrap();
        assert_eq!(found.name, "Coffee XL");
        assert_eq!(found.price_cents, 550);
        assert_eq!(products.count().unwrap(), 1);
    }

    #[test]
    fn test_delete() {
        let (_temp, products) = create_test_collection();

        products.add(Product::new(1, "Coffee", "Beverages", 450)).unwrap();
        assert!(products.delete(&1).unwrap());
        assert!(!products.delete(&1).unwrap());
        assert!(products.get(&1).unwrap().is_none());
    }

    #[test]
    fn test_search_by_index() {
        let (_temp, products) = create_test_collection();

        products.add(Product::new(1, "Coffee", "Beverages", 450)).unwrap();
        products.add(Product::new(2, "Tea", "Beverages", 300)).unwrap();
        products.add(Product::new(3, "Bagel", "Bakery", 250)).unwrap();

        let beverages = products.search("category", "beverages").unwrap();
        assert_eq!(beverages.len(), 2);

        let none = products.search("category", "frozen").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_search_unknown_index_fails() {
        let (_temp, products) = create_test_collection();

        let err = products.search("nope", "x").unwrap_err();
        assert!(matches!(err, VaultError::Schema(_)));
    }

    #[test]
    fn test_index_maintained_across_update_and_delete() {
        let (_temp, products) = create_test_collection();

        products.add(Product::new(1, "Coffee", "Beverages", 450)).unwrap();
        products.update(Product::new(1, "Coffee", "Bakery", 450)).unwrap();

        assert!(products.search("category", "beverages").unwrap().is_empty());
        assert_eq!(products.search("category", "bakery").unwrap().len(), 1);

        products.delete(&1).unwrap();
        assert!(products.search("category", "bakery").unwrap().is_empty());

        // Barcode is free again after delete
        products
            .add(Product::new(2, "Tea", "Beverages", 300).with_barcode("222"))
            .unwrap();
        products.delete(&2).unwrap();
        products
            .add(Product::new(3, "Chai", "Beverages", 350).with_barcode("222"))
            .unwrap();
    }

    #[test]
    fn test_date_range_query() {
        let temp_dir = TempDir::new().unwrap();
        let sales: Collection<Sale> = Collection::new(temp_dir.path().join("sales.json"));
        sales.load().unwrap();

        let item = SaleItem {
            product_id: 1,
            name: "Coffee".into(),
            category: "Beverages".into(),
            unit_price_cents: 450,
            quantity: 1,
        };

        let now = Utc::now();
        for (id, days_ago) in [(1u64, 10i64), (2, 5), (3, 1)] {
            let mut sale = Sale::new(id, vec![item.clone()], 0, 0);
            sale.date = now - Duration::days(days_ago);
            sales.add(sale).unwrap();
        }

        let start = (now - Duration::days(6)).to_rfc3339();
        let end = now.to_rfc3339();
        let recent = sales.get_by_range("date", &start, &end).unwrap();

        let ids: Vec<_> = recent.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_persistence_across_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("products.json");

        let products: Collection<Product> = Collection::new(path.clone());
        products.load().unwrap();
        products
            .add(Product::new(1, "Coffee", "Beverages", 450).with_barcode("111"))
            .unwrap();

        let reopened: Collection<Product> = Collection::new(path);
        reopened.load().unwrap();

        assert_eq!(reopened.count().unwrap(), 1);
        // Indexes rebuilt on load
        assert_eq!(reopened.search("barcode", "111").unwrap().len(), 1);
    }

    #[test]
    fn test_replace_all() {
        let (_temp, products) = create_test_collection();

        products.add(Product::new(1, "Old", "Misc", 100)).unwrap();
        products
            .replace_all(vec![
                Product::new(10, "New A", "Misc", 100),
                Product::new(11, "New B", "Misc", 200),
            ])
            .unwrap();

        assert!(products.get(&1).unwrap().is_none());
        assert_eq!(products.count().unwrap(), 2);
    }

    #[test]
    fn test_next_id() {
        let (_temp, products) = create_test_collection();

        assert_eq!(products.next_id().unwrap(), 1);
        products.add(Product::new(7, "Coffee", "Beverages", 450)).unwrap();
        assert_eq!(products.next_id().unwrap(), 8);
    }
}
