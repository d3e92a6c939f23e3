//! Backup pipeline for posvault
//!
//! Periodic and on-demand encrypted snapshots of every collection, with
//! retention pruning, validated restore, portable export/import, and
//! master-key rotation.
//!
//! # Architecture
//!
//! - `BackupManager`: orchestrates snapshots, encryption, retention, and
//!   restore over the store and encryption managers
//! - `Scheduler`: the recurring timer behind automatic backups
//! - `restore`: pre-restore validation with structured failure reasons
//!
//! Backups live inside the `backups` collection as sealed records whose
//! `encrypted_data` ciphertext must decrypt to a snapshot containing
//! every required collection before a restore is allowed to proceed.

mod manager;
mod restore;
mod scheduler;

pub use manager::{BackupManager, BackupStats};
pub use restore::{validate_snapshot, BackupValidation};
pub use scheduler::Scheduler;
