//! posvault - Durable local storage and encrypted backups for a retail POS
//!
//! This library provides the storage engine behind a point-of-sale
//! application: typed collections persisted as JSON files, an ambient
//! key-value mirror, AES-256-GCM encryption for backups and sensitive
//! fields, and a backup pipeline with scheduling, retention, restore,
//! and portable export/import.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path and settings management
//! - `error`: Custom error types
//! - `models`: Core data models (products, sales, shifts, backups, ...)
//! - `store`: Typed collections, indexes, snapshots, key-value mirror
//! - `crypto`: Master key lifecycle and AES-256-GCM helpers
//! - `backup`: Scheduled encrypted backups, retention, restore
//! - `vault`: The service object wiring the managers together
//!
//! # Example
//!
//! ```rust,ignore
//! use posvault::config::paths::VaultPaths;
//! use posvault::vault::Vault;
//!
//! let vault = Vault::open(VaultPaths::new()?)?;
//! let backup = vault.backups().create_manual_backup()?;
//! println!("backup {} created", backup.id);
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod store;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use vault::Vault;
