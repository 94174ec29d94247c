use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use ecash_store::{DynPersistenceBackend, MemoryBackend, WalletStore};
use ecash_store_redb::RedbBackend;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod config;
mod sub_commands;
mod utils;

use config::{Backend, Settings};

const DEFAULT_WORK_DIR: &str = ".ecash-store";
const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Inspect and maintain the local store of an ecash wallet
#[derive(Parser)]
#[command(name = "ecash-store")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to working dir
    #[arg(short, long)]
    work_dir: Option<PathBuf>,
    /// Path to config file, defaults to `config.toml` in the working dir
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Logging level
    #[arg(short, long, default_value = "error")]
    log_level: Level,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Balance
    Balance(sub_commands::balance::BalanceSubCommand),
    /// List unspent proofs
    Proofs(sub_commands::proofs::ProofsSubCommand),
    /// Inspect the raw proofs document
    DebugProofs,
    /// List mint quotes
    Quotes,
    /// Mark overdue pending quotes as expired
    ExpireQuotes(sub_commands::quotes::ExpireQuotesSubCommand),
    /// Keyset derivation counters
    Counters,
    /// Wallet seed
    Seed(sub_commands::seed::SeedSubCommand),
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();
    let default_filter = args.log_level;

    let redb_filter = "redb=warn";

    let env_filter = EnvFilter::new(format!("{default_filter},{redb_filter}"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let work_dir = match &args.work_dir {
        Some(work_dir) => work_dir.clone(),
        None => {
            let home_dir =
                home::home_dir().ok_or_else(|| anyhow!("Unable to determine home directory"))?;
            home_dir.join(DEFAULT_WORK_DIR)
        }
    };

    fs::create_dir_all(&work_dir)?;

    let config_file = args
        .config
        .clone()
        .unwrap_or_else(|| work_dir.join(DEFAULT_CONFIG_FILE));

    let mut settings = Settings::new(&config_file);
    settings.storage = settings.storage.from_env();

    let backend: DynPersistenceBackend = match settings.storage.backend {
        Backend::Redb => {
            let redb_path = settings.storage.redb_path(&work_dir);
            tracing::debug!("Opening redb store at {}", redb_path.display());
            Arc::new(RedbBackend::new(&redb_path)?)
        }
        Backend::Memory => {
            tracing::warn!("Using the memory backend, nothing will be persisted");
            Arc::new(MemoryBackend::new())
        }
    };

    let wallet = WalletStore::from_dyn(backend);

    match &args.command {
        Commands::Balance(sub_command_args) => {
            sub_commands::balance::balance(&wallet, sub_command_args)
        }
        Commands::Proofs(sub_command_args) => {
            sub_commands::proofs::list_proofs(&wallet, sub_command_args)
        }
        Commands::DebugProofs => sub_commands::proofs::debug_proofs(&wallet),
        Commands::Quotes => sub_commands::quotes::list_quotes(&wallet),
        Commands::ExpireQuotes(sub_command_args) => {
            sub_commands::quotes::expire_quotes(&wallet, sub_command_args)
        }
        Commands::Counters => sub_commands::counters::counters(&wallet),
        Commands::Seed(sub_command_args) => sub_commands::seed::seed(&wallet, sub_command_args),
    }
}
