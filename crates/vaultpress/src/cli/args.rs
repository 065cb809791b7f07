//! Command-line arguments (clap derive).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vaultpress")]
#[command(version, about = "Publish vault notes to a headless CMS", long_about = None)]
pub struct Cli {
    /// Vault root (default: nearest ancestor with a .obsidian directory, else the note's directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub vault: Option<PathBuf>,

    /// Settings file (default: ~/.config/vaultpress/config.toml)
    #[arg(long, global = true, env = "VAULTPRESS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log requests and pipeline steps
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish a note to the CMS (create or update by slug)
    Publish {
        /// Markdown note to publish
        file: PathBuf,
    },

    /// Pull metadata from the CMS into a note, then open it in an editor
    Open {
        /// Markdown note to open
        file: PathBuf,

        /// Sync metadata only; don't launch the editor
        #[arg(long)]
        no_edit: bool,
    },

    /// Pull metadata from the CMS into a note's frontmatter
    Sync {
        /// Markdown note to update
        file: PathBuf,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage locally stored secrets
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current settings
    Show,

    /// Set the CMS base URL
    SetUrl {
        /// Base URL, e.g. https://cms.example.com/api
        url: String,
    },

    /// Set the id of the secret holding the API key
    SetKey {
        /// Secret id (see `vaultpress secret`)
        secret_id: String,
    },

    /// Set the editor used by `vaultpress open`
    SetEditor {
        /// Editor command
        editor: String,
    },

    /// Set the request timeout
    SetTimeout {
        /// Timeout in seconds
        seconds: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum SecretCommands {
    /// Store a secret (reads the value from stdin when omitted)
    Set {
        /// Secret id
        id: String,

        /// Secret value
        value: Option<String>,
    },

    /// Delete a secret
    Remove {
        /// Secret id
        id: String,
    },

    /// List stored secret ids
    List,
}
