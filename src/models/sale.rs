//! Sale model
//!
//! A sale holds a value-copied customer snapshot, an ordered list of line
//! items, computed totals, a payment-method tag, and an optional
//! down-payment sub-record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a sale was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Mobile,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "Cash"),
            Self::Card => write!(f, "Card"),
            Self::Mobile => write!(f, "Mobile"),
        }
    }
}

/// Down-payment type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownPaymentKind {
    Cash,
    Card,
}

/// Partial payment recorded against a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownPayment {
    /// Amount paid up front, in cents
    pub amount_cents: i64,

    /// How the down payment was made
    #[serde(rename = "type")]
    pub kind: DownPaymentKind,

    /// Balance still owed, in cents
    pub remaining_cents: i64,
}

/// Value copy of the customer at sale time
///
/// Kept inside the sale so later customer edits don't rewrite history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// One line item on a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    /// Product id at sale time
    pub product_id: u64,
    /// Product name at sale time
    pub name: String,
    /// Category at sale time
    pub category: String,
    /// Unit price in cents
    pub unit_price_cents: i64,
    /// Quantity sold
    pub quantity: u32,
}

impl SaleItem {
    /// Line total in cents
    pub fn total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity as i64
    }
}

/// A completed sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    /// Unique numeric identifier
    pub id: u64,

    /// When the sale happened
    pub date: DateTime<Utc>,

    /// Customer snapshot taken at sale time
    #[serde(default)]
    pub customer: CustomerSnapshot,

    /// Id of the customer record, if the buyer is a known customer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,

    /// Id of the shift this sale was rung up under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_id: Option<u64>,

    /// Ordered line items
    pub items: Vec<SaleItem>,

    /// Sum of line totals, in cents
    pub subtotal_cents: i64,

    /// Discount applied, in cents
    #[serde(default)]
    pub discount_cents: i64,

    /// Tax charged, in cents
    #[serde(default)]
    pub tax_cents: i64,

    /// Final amount, in cents
    pub total_cents: i64,

    /// Payment method tag
    #[serde(default)]
    pub payment_method: PaymentMethod,

    /// Optional down-payment sub-record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_payment: Option<DownPayment>,
}

impl Sale {
    /// Create a sale from line items, computing the subtotal and total
    ///
    /// The caller supplies discount and tax; the arithmetic that produces
    /// them lives in the pricing layer, outside this crate.
    pub fn new(id: u64, items: Vec<SaleItem>, discount_cents: i64, tax_cents: i64) -> Self {
        let subtotal_cents: i64 = items.iter().map(SaleItem::total_cents).sum();
        let total_cents = subtotal_cents - discount_cents + tax_cents;
        Self {
            id,
            date: Utc::now(),
            customer: CustomerSnapshot::default(),
            customer_id: None,
            shift_id: None,
            items,
            subtotal_cents,
            discount_cents,
            tax_cents,
            total_cents,
            payment_method: PaymentMethod::Cash,
            down_payment: None,
        }
    }

    /// Attach a customer snapshot and id
    pub fn with_customer(mut self, customer_id: u64, snapshot: CustomerSnapshot) -> Self {
        self.customer_id = Some(customer_id);
        self.customer = snapshot;
        self
    }

    /// Attach the shift this sale belongs to
    pub fn with_shift(mut self, shift_id: u64) -> Self {
        self.shift_id = Some(shift_id);
        self
    }
}
