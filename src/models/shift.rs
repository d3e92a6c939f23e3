//! Shift model
//!
//! A register shift accumulates an append-only list of sale references and
//! running totals while active, then is ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shift status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Active,
    Ended,
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// A register shift
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    /// Unique numeric identifier
    pub id: u64,

    /// When the shift opened
    pub start_time: DateTime<Utc>,

    /// When the shift ended, if it has
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Current status
    pub status: ShiftStatus,

    /// Ids of sales rung up during this shift, in order
    #[serde(default)]
    pub sale_ids: Vec<u64>,

    /// Running total of sale amounts, in cents
    #[serde(default)]
    pub total_sales_cents: i64,

    /// Running count of orders
    #[serde(default)]
    pub total_orders: u64,
}

impl Shift {
    /// Open a new shift
    pub fn open(id: u64) -> Self {
        Self {
            id,
            start_time: Utc::now(),
            end_time: None,
            status: ShiftStatus::Active,
            sale_ids: Vec::new(),
            total_sales_cents: 0,
            total_orders: 0,
        }
    }

    /// Record a sale against this shift; sale_ids is append-only
    pub fn record_sale(&mut self, sale_id: u64, total_cents: i64) {
        self.sale_ids.push(sale_id);
        self.total_sales_cents += total_cents;
        self.total_orders += 1;
    }

    /// End the shift
    pub fn end(&mut self) {
        self.status = ShiftStatus::Ended;
        self.end_time = Some(Utc::now());
    }

    /// Whether the shift is still taking sales
    pub fn is_active(&self) -> bool {
        self.status == ShiftStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_shift() {
        let shift = Shift::open(1);
        assert!(shift.is_active());
        assert!(shift.end_time.is_none());
        assert_eq!(shift.total_orders, 0);
    }

    #[test]
    fn test_record_sale_accumulates() {
        let mut shift = Shift::open(2);
        shift.record_sale(10, 1200);
        shift.record_sale(11, 800);

        assert_eq!(shift.sale_ids, vec![10, 11]);
        assert_eq!(shift.total_sales_cents, 2000);
        assert_eq!(shift.total_orders, 2);
    }

    #[test]
    fn test_end_shift() {
        let mut shift = Shift::open(3);
        shift.end();
        assert_eq!(shift.status, ShiftStatus::Ended);
        assert!(shift.end_time.is_some());
        assert!(!shift.is_active());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&ShiftStatus::Active).unwrap(), "\"active\"");
        assert_eq!(serde_json::to_string(&ShiftStatus::Ended).unwrap(), "\"ended\"");
    }
}
