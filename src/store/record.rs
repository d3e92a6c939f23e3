//! Collection schema: the `Record` trait and per-type index declarations
//!
//! Every stored type declares its collection name, primary-key type, and
//! secondary indexes in one place. The generic `Collection<R>` repository
//! is instantiated once per record type, so an unknown collection name is
//! a compile error instead of a runtime string lookup.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{
    BackupRecord, Category, Customer, Product, ReturnRecord, Sale, Setting, Shift, User,
};

/// A secondary index declaration
///
/// The extractor returns `None` when the record has no value for the
/// index (e.g. a product without a barcode), in which case the record is
/// simply absent from that index.
pub struct IndexDef<R> {
    /// Index name used by `search` / `get_by_range`
    pub name: &'static str,
    /// Whether two records may share an index value
    pub unique: bool,
    /// Extracts the index value; date-like indexes use RFC 3339 so
    /// lexicographic order is chronological
    pub key_fn: fn(&R) -> Option<String>,
}

/// A storable record type with a primary key and declared indexes
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Primary key type
    type Key: Ord + Clone + fmt::Display + Send + Sync + 'static;

    /// Collection name this type is stored under
    const COLLECTION: &'static str;

    /// The record's primary key
    fn key(&self) -> Self::Key;

    /// Declared secondary indexes
    fn indexes() -> &'static [IndexDef<Self>];
}

impl Record for Product {
    type Key = u64;
    const COLLECTION: &'static str = "products";

    fn key(&self) -> u64 {
        self.id
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        const INDEXES: &[IndexDef<Product>] = &[
            IndexDef {
                name: "name",
                unique: false,
                key_fn: |p: &Product| Some(p.name.to_lowercase()),
            },
            IndexDef {
                name: "category",
                unique: false,
                key_fn: |p: &Product| Some(p.category.to_lowercase()),
            },
            IndexDef {
                name: "barcode",
                unique: true,
                key_fn: |p: &Product| p.barcode.clone(),
            },
        ];
        INDEXES
    }
}

impl Record for Category {
    type Key = u64;
    const COLLECTION: &'static str = "categories";

    fn key(&self) -> u64 {
        self.id
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        const INDEXES: &[IndexDef<Category>] = &[IndexDef {
            name: "name",
            unique: true,
            key_fn: |c: &Category| Some(c.name.to_lowercase()),
        }];
        INDEXES
    }
}

impl Record for Customer {
    type Key = u64;
    const COLLECTION: &'static str = "customers";

    fn key(&self) -> u64 {
        self.id
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        const INDEXES: &[IndexDef<Customer>] = &[
            IndexDef {
                name: "name",
                unique: false,
                key_fn: |c: &Customer| Some(c.name.to_lowercase()),
            },
            IndexDef {
                name: "phone",
                unique: true,
                key_fn: |c: &Customer| c.phone.clone(),
            },
            IndexDef {
                name: "email",
                unique: true,
                key_fn: |c: &Customer| c.email.as_ref().map(|e| e.to_lowercase()),
            },
        ];
        INDEXES
    }
}

impl Record for Sale {
    type Key = u64;
    const COLLECTION: &'static str = "sales";

    fn key(&self) -> u64 {
        self.id
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        const INDEXES: &[IndexDef<Sale>] = &[
            IndexDef {
                name: "date",
                unique: false,
                key_fn: |s: &Sale| Some(s.date.to_rfc3339()),
            },
            IndexDef {
                name: "customerId",
                unique: false,
                key_fn: |s: &Sale| s.customer_id.map(|id| id.to_string()),
            },
            IndexDef {
                name: "shiftId",
                unique: false,
                key_fn: |s: &Sale| s.shift_id.map(|id| id.to_string()),
            },
        ];
        INDEXES
    }
}

impl Record for Shift {
    type Key = u64;
    const COLLECTION: &'static str = "shifts";

    fn key(&self) -> u64 {
        self.id
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        const INDEXES: &[IndexDef<Shift>] = &[
            IndexDef {
                name: "startTime",
                unique: false,
                key_fn: |s: &Shift| Some(s.start_time.to_rfc3339()),
            },
            IndexDef {
                name: "status",
                unique: false,
                key_fn: |s: &Shift| Some(s.status.to_string()),
            },
        ];
        INDEXES
    }
}

impl Record for ReturnRecord {
    type Key = u64;
    const COLLECTION: &'static str = "returns";

    fn key(&self) -> u64 {
        self.id
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        const INDEXES: &[IndexDef<ReturnRecord>] = &[
            IndexDef {
                name: "saleId",
                unique: false,
                key_fn: |r: &ReturnRecord| Some(r.sale_id.to_string()),
            },
            IndexDef {
                name: "date",
                unique: false,
                key_fn: |r: &ReturnRecord| Some(r.date.to_rfc3339()),
            },
        ];
        INDEXES
    }
}

impl Record for User {
    type Key = String;
    const COLLECTION: &'static str = "users";

    fn key(&self) -> String {
        self.username.clone()
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        &[]
    }
}

impl Record for Setting {
    type Key = String;
    const COLLECTION: &'static str = "settings";

    fn key(&self) -> String {
        self.key.clone()
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        &[]
    }
}

impl Record for BackupRecord {
    type Key = String;
    const COLLECTION: &'static str = "backups";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn indexes() -> &'static [IndexDef<Self>] {
        const INDEXES: &[IndexDef<BackupRecord>] = &[
            IndexDef {
                name: "date",
                unique: false,
                key_fn: |b: &BackupRecord| Some(b.date.to_rfc3339()),
            },
            IndexDef {
                name: "type",
                unique: false,
                key_fn: |b: &BackupRecord| Some(b.kind.to_string()),
            },
        ];
        INDEXES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_schema() {
        assert_eq!(Product::COLLECTION, "products");
        let names: Vec<_> = Product::indexes().iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["name", "category", "barcode"]);
        assert!(Product::indexes()[2].unique);
    }

    #[test]
    fn test_optional_index_value_absent() {
        let product = Product::new(1, "Coffee", "Beverages", 450);
        let barcode_idx = &Product::indexes()[2];
        assert_eq!((barcode_idx.key_fn)(&product), None);
    }

    #[test]
    fn test_sale_date_index_is_rfc3339() {
        let sale = Sale::new(1, vec![], 0, 0);
        let date_idx = &Sale::indexes()[0];
        let value = (date_idx.key_fn)(&sale).unwrap();
        assert!(value.contains('T'));
    }

    #[test]
    fn test_string_keyed_records() {
        let user = User::new("ada", "admin", "hash");
        assert_eq!(user.key(), "ada");
        assert_eq!(User::COLLECTION, "users");
        assert!(User::indexes().is_empty());
    }
}
