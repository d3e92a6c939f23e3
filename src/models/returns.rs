//! Return model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sale::SaleItem;

/// A return against a previous sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRecord {
    /// Unique numeric identifier
    pub id: u64,

    /// The sale being returned against
    pub sale_id: u64,

    /// When the return was processed
    pub date: DateTime<Utc>,

    /// Items returned
    #[serde(default)]
    pub items: Vec<SaleItem>,

    /// Amount refunded, in cents
    pub refund_cents: i64,

    /// Free-form reason
    #[serde(default)]
    pub reason: String,
}

impl ReturnRecord {
    /// Create a new return
    pub fn new(id: u64, sale_id: u64, items: Vec<SaleItem>, reason: impl Into<String>) -> Self {
        let refund_cents = items.iter().map(SaleItem::total_cents).sum();
        Self {
            id,
            sale_id,
            date: Utc::now(),
            items,
            refund_cents,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refund_computed_from_items() {
        let items = vec![SaleItem {
            product_id: 1,
            name: "Coffee".into(),
            category: "Beverages".into(),
            unit_price_cents: 450,
            quantity: 2,
        }];
        let ret = ReturnRecord::new(1, 42, items, "damaged");
        assert_eq!(ret.sale_id, 42);
        assert_eq!(ret.refund_cents, 900);
    }
}
