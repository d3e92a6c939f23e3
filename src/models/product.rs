//! Product model
//!
//! Represents items for sale: name, category, barcode, price, and stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique numeric identifier
    pub id: u64,

    /// Product name (e.g., "Espresso Beans 1kg")
    pub name: String,

    /// Category name this product belongs to
    pub category: String,

    /// Scannable barcode; unique across the catalog when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,

    /// Unit price in cents
    pub price_cents: i64,

    /// Units currently in stock
    #[serde(default)]
    pub stock: i64,

    /// When the product was created
    pub created_at: DateTime<Utc>,

    /// When the product was last modified
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product with default values
    pub fn new(id: u64, name: impl Into<String>, category: impl Into<String>, price_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            category: category.into(),
            barcode: None,
            price_cents,
            stock: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the barcode
    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Adjust the stock level by a delta (negative for sales)
    pub fn adjust_stock(&mut self, delta: i64) {
        self.stock += delta;
        self.updated_at = Utc::now();
    }

    /// Validate the product
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name cannot be empty".into());
        }
        if self.price_cents < 0 {
            return Err("Product price cannot be negative".into());
        }
        Ok(())
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product() {
        let product = Product::new(1, "Coffee", "Beverages", 450);
        assert_eq!(product.id, 1);
        assert_eq!(product.name, "Coffee");
        assert_eq!(product.price_cents, 450);
        assert_eq!(product.stock, 0);
        assert!(product.barcode.is_none());
    }

    #[test]
    fn test_with_barcode() {
        let product = Product::new(2, "Tea", "Beverages", 300).with_barcode("0012345678905");
        assert_eq!(product.barcode.as_deref(), Some("0012345678905"));
    }

    #[test]
    fn test_adjust_stock() {
        let mut product = Product::new(3, "Milk", "Dairy", 250);
        product.adjust_stock(10);
        assert_eq!(product.stock, 10);
        product.adjust_stock(-3);
        assert_eq!(product.stock, 7);
    }

    #[test]
    fn test_validation() {
        let mut product = Product::new(4, "Valid", "Misc", 100);
        assert!(product.validate().is_ok());

        product.name = "  ".into();
        assert!(product.validate().is_err());

        product.name = "Valid".into();
        product.price_cents = -1;
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_serialization() {
        let product = Product::new(5, "Bread", "Bakery", 199);
        let json = serde_json::to_string(&product).unwrap();
        let deserialized: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(product.id, deserialized.id);
        assert_eq!(product.name, deserialized.name);
    }
}
