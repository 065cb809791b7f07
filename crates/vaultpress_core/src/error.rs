//! Error types shared by every vaultpress operation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the vaultpress core library.
#[derive(Debug, Error)]
pub enum VaultpressError {
    /// Reading a file from the vault or config directory failed.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Writing a file failed.
    #[error("Failed to write '{path}': {source}")]
    FileWrite {
        /// Path that could not be written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Frontmatter exists but cannot be used.
    #[error("Invalid frontmatter: {0}")]
    InvalidFrontmatter(String),

    /// A document path does not belong to the vault.
    #[error("'{0}' is not inside the vault")]
    OutsideVault(PathBuf),

    /// YAML (de)serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The settings or secrets file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The settings or secrets file could not be serialized.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// No platform config directory is available.
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Transport-level HTTP failure (DNS, TLS, timeout, malformed response).
    #[error("{0}")]
    Http(#[from] ureq::Error),

    /// The CMS answered with a status the caller treats as a failure.
    #[error("{operation} failed with status {status}")]
    HttpStatus {
        /// Human-readable name of the request
        operation: &'static str,
        /// HTTP status code
        status: u16,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, VaultpressError>;
