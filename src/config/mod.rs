//! Configuration and path management for posvault

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{BackupSettings, Settings};
