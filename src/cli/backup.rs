//! Backup CLI commands

use std::path::PathBuf;

use clap::Subcommand;

use crate::error::VaultResult;
use crate::vault::Vault;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new encrypted backup now
    Create,

    /// List all stored backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore from a stored backup (use 'latest' for the most recent)
    Restore {
        /// Backup id
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a stored backup without restoring it
    Validate {
        /// Backup id
        backup: String,
    },

    /// Delete one stored backup
    Delete {
        /// Backup id
        backup: String,
    },

    /// Delete backups beyond the retention ceiling
    Prune,

    /// Export a backup as a plaintext JSON file
    Export {
        /// Backup id (use 'latest' for the most recent)
        backup: String,

        /// Output directory (defaults to the vault export directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Import an exported file as a new backup record
    Import {
        /// Path to the exported JSON file
        file: PathBuf,
    },

    /// Show backup counters and scheduling settings
    Stats,

    /// Update scheduling and retention settings
    Configure {
        /// Enable or disable automatic backups
        #[arg(long)]
        enabled: Option<bool>,

        /// Minutes between automatic backups
        #[arg(long)]
        frequency: Option<u64>,

        /// Maximum number of backups to keep
        #[arg(long)]
        max: Option<usize>,
    },
}

/// Handle a backup command
pub fn handle_backup_command(vault: &Vault, cmd: BackupCommands) -> VaultResult<()> {
    let manager = vault.backups();

    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let record = manager.create_manual_backup()?;
            println!("Backup created: {}", record.id);
            println!("Size: {}", format_size(record.size_bytes()));
        }

        BackupCommands::List { verbose } => {
            let backups = manager.list_backups()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: posvault backup create");
                return Ok(());
            }

            println!("Stored Backups");
            println!("==============");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                if verbose {
                    println!(
                        "{}. {}\n   Type: {}\n   Created: {}\n   Size: {}\n",
                        i + 1,
                        backup.id,
                        backup.kind,
                        backup.date.format("%Y-%m-%d %H:%M:%S UTC"),
                        format_size(backup.size_bytes()),
                    );
                } else {
                    println!(
                        "  {}. {} [{}] ({}, {})",
                        i + 1,
                        backup.id,
                        backup.kind,
                        backup.date.format("%Y-%m-%d %H:%M"),
                        format_size(backup.size_bytes()),
                    );
                }
            }

            println!();
            println!("Total: {} backup(s)", backups.len());
        }

        BackupCommands::Restore { backup, force } => {
            let id = resolve_backup_id(vault, &backup)?;

            let validation = manager.validate_backup(&id)?;
            if !validation.is_valid {
                println!("Backup {} failed validation:", id);
                if let Some(reason) = validation.error {
                    println!("  {}", reason);
                }
                return Ok(());
            }

            if !force {
                println!("This will overwrite all current data with backup {}.", id);
                println!("Re-run with --force to proceed.");
                return Ok(());
            }

            let summary = manager.restore_backup(&id)?;
            println!(
                "Restored {} collections and {} settings entries from {}",
                summary.restored.len(),
                summary.kv_entries,
                id
            );
            if !summary.skipped.is_empty() {
                println!("Skipped unknown collections: {}", summary.skipped.join(", "));
            }
        }

        BackupCommands::Validate { backup } => {
            let id = resolve_backup_id(vault, &backup)?;
            let validation = manager.validate_backup(&id)?;
            if validation.is_valid {
                println!("Backup {} is valid.", id);
                if let Some(date) = validation.backup_date {
                    println!("Created: {}", date.format("%Y-%m-%d %H:%M:%S UTC"));
                }
            } else {
                println!("Backup {} is NOT valid:", id);
                if let Some(reason) = validation.error {
                    println!("  {}", reason);
                }
            }
        }

        BackupCommands::Delete { backup } => {
            let id = resolve_backup_id(vault, &backup)?;
            if manager.delete_backup(&id)? {
                println!("Deleted backup {}", id);
            } else {
                println!("No backup with id {}", id);
            }
        }

        BackupCommands::Prune => {
            let pruned = manager.cleanup_old_backups()?;
            println!("Pruned {} backup(s).", pruned);
        }

        BackupCommands::Export { backup, out } => {
            let id = resolve_backup_id(vault, &backup)?;
            let path = manager.export_backup(&id, out.as_deref())?;
            println!("Exported backup {} to {}", id, path.display());
            println!("Note: the export file is plaintext JSON.");
        }

        BackupCommands::Import { file } => {
            let record = manager.import_backup(&file)?;
            println!("Imported {} as backup {}", file.display(), record.id);
            println!("Restore it with: posvault backup restore {} --force", record.id);
        }

        BackupCommands::Stats => {
            let stats = manager.get_stats()?;
            println!("Backups:        {}", stats.total);
            println!("Total size:     {}", format_size(stats.total_size_bytes));
            match stats.last_backup {
                Some(date) => {
                    println!("Last backup:    {}", date.format("%Y-%m-%d %H:%M:%S UTC"))
                }
                None => println!("Last backup:    never"),
            }
            println!(
                "Auto backups:   {} (every {} minutes, keep {})",
                if stats.settings.enabled { "enabled" } else { "disabled" },
                stats.settings.frequency_minutes,
                stats.settings.max_backups,
            );
            println!(
                "Timer running:  {}",
                if stats.auto_backup_running { "yes" } else { "no" }
            );
        }

        BackupCommands::Configure {
            enabled,
            frequency,
            max,
        } => {
            let mut settings = manager.get_stats()?.settings;
            if let Some(enabled) = enabled {
                settings.enabled = enabled;
            }
            if let Some(frequency) = frequency {
                settings.frequency_minutes = frequency;
            }
            if let Some(max) = max {
                settings.max_backups = max;
            }
            manager.update_settings(settings.clone())?;
            println!(
                "Backup settings updated: {}, every {} minutes, keep {}.",
                if settings.enabled { "enabled" } else { "disabled" },
                settings.frequency_minutes,
                settings.max_backups,
            );
        }
    }

    Ok(())
}

/// Map 'latest' to the newest backup id
fn resolve_backup_id(vault: &Vault, backup: &str) -> VaultResult<String> {
    if backup != "latest" {
        return Ok(backup.to_string());
    }
    vault
        .backups()
        .list_backups()?
        .first()
        .map(|b| b.id.clone())
        .ok_or_else(|| crate::error::VaultError::Validation("no backups exist yet".into()))
}

fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
