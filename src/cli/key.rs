//! Master key CLI commands

use clap::Subcommand;

use crate::error::VaultResult;
use crate::vault::Vault;

/// Master key subcommands
#[derive(Subcommand)]
pub enum KeyCommands {
    /// Print the master key as base64 for offline safekeeping
    Export,

    /// Install a previously exported master key
    Import {
        /// Base64 key from `key export`
        key: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Rotate the master key, re-encrypting all stored backups
    Rotate {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Run a round-trip self-test of the loaded key
    Validate,
}

/// Handle a key command
pub fn handle_key_command(vault: &Vault, cmd: KeyCommands) -> VaultResult<()> {
    match cmd {
        KeyCommands::Export => {
            println!("{}", vault.crypto().export_key()?);
        }

        KeyCommands::Import { key, force } => {
            if !force {
                println!("Importing a key makes data encrypted under the current key unreadable.");
                println!("Export the current key first, then re-run with --force.");
                return Ok(());
            }
            vault.crypto().import_key(&key)?;
            vault.crypto().validate_key()?;
            println!("Master key imported.");
        }

        KeyCommands::Rotate { force } => {
            if !force {
                println!("Rotating the master key re-encrypts every stored backup.");
                println!("Password hashes created under the old key will stop verifying.");
                println!("Re-run with --force to proceed.");
                return Ok(());
            }
            let rotated = vault.backups().rotate_key()?;
            println!("Master key rotated; {} backup(s) re-encrypted.", rotated);
        }

        KeyCommands::Validate => {
            vault.crypto().validate_key()?;
            println!("Key OK.");
        }
    }

    Ok(())
}
