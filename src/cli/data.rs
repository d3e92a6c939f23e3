//! Data export/import CLI commands

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;

use crate::error::{VaultError, VaultResult};
use crate::vault::Vault;

/// Data transfer subcommands
#[derive(Subcommand)]
pub enum DataCommands {
    /// Export all data as a plaintext JSON file
    Export {
        /// Output file path
        file: PathBuf,
    },

    /// Import data from an exported JSON file
    Import {
        /// Path to the exported JSON file
        file: PathBuf,
    },

    /// Export only settings
    ExportSettings {
        /// Output file path
        file: PathBuf,
    },

    /// Import only settings from an exported JSON file
    ImportSettings {
        /// Path to the exported JSON file
        file: PathBuf,
    },
}

/// Handle a data command
pub fn handle_data_command(vault: &Vault, cmd: DataCommands) -> VaultResult<()> {
    let store = vault.store();

    match cmd {
        DataCommands::Export { file } => {
            let export = store.export_data()?;
            write_json(&file, &export)?;
            println!("Exported all data to {}", file.display());
        }

        DataCommands::Import { file } => {
            let value = read_json(&file)?;
            let summary = store.import_data(value)?;
            println!(
                "Imported {} collections and {} settings entries",
                summary.restored.len(),
                summary.kv_entries
            );
            if !summary.skipped.is_empty() {
                println!("Skipped unknown collections: {}", summary.skipped.join(", "));
            }
        }

        DataCommands::ExportSettings { file } => {
            let export = store.export_settings()?;
            write_json(&file, &export)?;
            println!("Exported settings to {}", file.display());
        }

        DataCommands::ImportSettings { file } => {
            let value = read_json(&file)?;
            let summary = store.import_settings(value)?;
            println!(
                "Imported {} collections and {} settings entries",
                summary.restored.len(),
                summary.kv_entries
            );
        }
    }

    Ok(())
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> VaultResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .map_err(|e| VaultError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

fn read_json(path: &PathBuf) -> VaultResult<serde_json::Value> {
    let contents = fs::read_to_string(path)
        .map_err(|e| VaultError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| VaultError::Validation(format!("{} is not valid JSON: {}", path.display(), e)))
}
