//! Core data models for posvault
//!
//! This module contains all record types stored in the engine's
//! collections: products, categories, customers, sales, shifts, returns,
//! users, settings, and backup records.

pub mod backup;
pub mod category;
pub mod customer;
pub mod product;
pub mod returns;
pub mod sale;
pub mod setting;
pub mod shift;
pub mod user;

pub use backup::{BackupKind, BackupRecord};
pub use category::Category;
pub use customer::Customer;
pub use product::Product;
pub use returns::ReturnRecord;
pub use sale::{CustomerSnapshot, DownPayment, DownPaymentKind, PaymentMethod, Sale, SaleItem};
pub use setting::Setting;
pub use shift::{Shift, ShiftStatus};
pub use user::User;
