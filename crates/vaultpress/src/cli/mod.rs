//! Command dispatch for the `vaultpress` binary.

mod args;
mod host;
mod open;
mod publish;
mod settings;

use std::path::PathBuf;

use clap::Parser;
use vaultpress_core::secrets::{EnvSecretResolver, SecretChain, SecretStore};
use vaultpress_core::{Result, Settings, VaultpressError};

use args::{Cli, Commands};

/// Paths and settings shared by every command.
pub struct CliContext {
    /// Settings file location
    pub config_path: PathBuf,
    /// Secret store location
    pub secrets_path: PathBuf,
    /// Settings loaded from `config_path`
    pub settings: Settings,
}

impl CliContext {
    /// Load settings from `config_override` or the default location.
    ///
    /// The secret store lives beside the settings file.
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(path) => path,
            None => Settings::config_path().ok_or(VaultpressError::NoConfigDir)?,
        };
        let secrets_path = config_path.with_file_name("secrets.toml");
        let settings = Settings::load_from(&config_path)?;
        Ok(Self {
            config_path,
            secrets_path,
            settings,
        })
    }

    /// Open the local secret store.
    pub fn secret_store(&self) -> Result<SecretStore> {
        SecretStore::open(&self.secrets_path)
    }

    /// Environment variables first, then the local store.
    pub fn secrets(&self) -> Result<SecretChain> {
        Ok(SecretChain::new()
            .with(EnvSecretResolver)
            .with(self.secret_store()?))
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Parse arguments and run the command. Returns whether it succeeded.
pub fn run_cli() -> bool {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = match CliContext::load(cli.config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("✗ Error loading config: {}", e);
            return false;
        }
    };

    match cli.command {
        Commands::Publish { file } => publish::handle_publish(&ctx, &file, cli.vault.as_deref()),
        Commands::Open { file, no_edit } => {
            open::handle_open(&ctx, &file, cli.vault.as_deref(), no_edit)
        }
        Commands::Sync { file } => open::handle_sync(&ctx, &file, cli.vault.as_deref()),
        Commands::Config { command } => settings::handle_config(ctx, command),
        Commands::Secret { command } => settings::handle_secret(&ctx, command),
    }
}
