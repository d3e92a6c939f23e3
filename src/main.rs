use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use posvault::cli::{
    handle_backup_command, handle_data_command, handle_key_command, BackupCommands, DataCommands,
    KeyCommands,
};
use posvault::config::paths::VaultPaths;
use posvault::config::settings::Settings;
use posvault::vault::Vault;

#[derive(Parser)]
#[command(
    name = "posvault",
    version,
    about = "Durable local storage and encrypted backups for a retail POS",
    long_about = "posvault is the storage engine behind a point-of-sale \
                  application: typed JSON collections with secondary indexes, \
                  AES-256-GCM encrypted backups with scheduling and retention, \
                  and portable export/import."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and collection files
    Init,

    /// Show current configuration and paths
    Config,

    /// Show record counts per collection
    Stats,

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Data export/import commands
    #[command(subcommand)]
    Data(DataCommands),

    /// Master key commands
    #[command(subcommand)]
    Key(KeyCommands),
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "posvault=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let vault = Vault::open(VaultPaths::new()?)?;

    let result = run(&vault, cli.command);
    vault.close();
    result
}

fn run(vault: &Vault, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            vault.store().ensure_stores_exist()?;
            let settings = Settings::load_or_create(vault.store().paths())?;
            settings.save(vault.store().paths())?;
            println!(
                "Initialized vault at {}",
                vault.store().paths().base_dir().display()
            );
        }

        Commands::Config => {
            let paths = vault.store().paths();
            let settings = Settings::load_or_create(paths)?;
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Export directory: {}", paths.export_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            if !settings.store.name.is_empty() {
                println!("Store:            {}", settings.store.name);
            }
            println!("Currency:         {}", settings.currency_symbol);
            println!(
                "Tax rate:         {:.2}%",
                settings.tax_rate_bps as f64 / 100.0
            );
        }

        Commands::Stats => {
            let stats = vault.store().get_stats()?;
            println!("Collection counts");
            println!("=================");
            for (name, count) in &stats {
                println!("{:<12} {}", name, count);
            }
        }

        Commands::Backup(cmd) => handle_backup_command(vault, cmd)?,
        Commands::Data(cmd) => handle_data_command(vault, cmd)?,
        Commands::Key(cmd) => handle_key_command(vault, cmd)?,
    }

    Ok(())
}
