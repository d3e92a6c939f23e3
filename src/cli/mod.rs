//! CLI command handlers
//!
//! Bridges clap argument parsing with the vault services.

pub mod backup;
pub mod data;
pub mod key;

pub use backup::{handle_backup_command, BackupCommands};
pub use data::{handle_data_command, DataCommands};
pub use key::{handle_key_command, KeyCommands};
