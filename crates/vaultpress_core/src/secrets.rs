//! Secret lookup for the CMS API key.
//!
//! Settings only hold the *id* of a secret. The value comes from a
//! [`SecretResolver`]: the environment, a local `secrets.toml`, or both
//! chained together.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultpressError};
use crate::host::SecretResolver;

/// Prefix of environment variables consulted by [`EnvSecretResolver`].
pub const ENV_PREFIX: &str = "VAULTPRESS_SECRET_";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SecretFile {
    #[serde(default)]
    secrets: BTreeMap<String, String>,
}

/// Secrets stored in a TOML file readable only by the owner.
#[derive(Debug, Clone)]
pub struct SecretStore {
    path: PathBuf,
    secrets: BTreeMap<String, String>,
}

impl SecretStore {
    /// Load the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let secrets = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| VaultpressError::FileRead {
                path: path.clone(),
                source,
            })?;
            toml::from_str::<SecretFile>(&contents)?.secrets
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, secrets })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store `value` under `id` and persist.
    pub fn set(&mut self, id: &str, value: &str) -> Result<()> {
        self.secrets.insert(id.to_string(), value.to_string());
        self.save()
    }

    /// Remove `id` and persist. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let existed = self.secrets.remove(id).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// Stored ids, sorted.
    pub fn list_ids(&self) -> Vec<&str> {
        self.secrets.keys().map(String::as_str).collect()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| VaultpressError::FileWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(&SecretFile {
            secrets: self.secrets.clone(),
        })?;
        write_private(&self.path, contents.as_bytes()).map_err(|source| {
            VaultpressError::FileWrite {
                path: self.path.clone(),
                source,
            }
        })?;
        log::debug!("saved {} secrets to {}", self.secrets.len(), self.path.display());
        Ok(())
    }
}

impl SecretResolver for SecretStore {
    fn get_secret(&self, id: &str) -> Option<String> {
        self.secrets.get(id).cloned()
    }
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::File::create(path)?.write_all(bytes)
}

/// Reads secrets from `VAULTPRESS_SECRET_<ID>` environment variables.
///
/// The id is uppercased and `-`, `.`, and spaces become `_`, so `cms-key`
/// is read from `VAULTPRESS_SECRET_CMS_KEY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretResolver;

impl EnvSecretResolver {
    /// Environment variable consulted for `id`.
    pub fn var_name(id: &str) -> String {
        let suffix: String = id
            .trim()
            .chars()
            .map(|c| match c {
                '-' | '.' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{}", ENV_PREFIX, suffix)
    }
}

impl SecretResolver for EnvSecretResolver {
    fn get_secret(&self, id: &str) -> Option<String> {
        std::env::var(Self::var_name(id)).ok()
    }
}

/// Tries each resolver in turn and returns the first non-empty value.
#[derive(Default)]
pub struct SecretChain {
    resolvers: Vec<Box<dyn SecretResolver>>,
}

impl SecretChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver consulted after the existing ones.
    pub fn with(mut self, resolver: impl SecretResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl SecretResolver for SecretChain {
    fn get_secret(&self, id: &str) -> Option<String> {
        self.resolvers
            .iter()
            .filter_map(|resolver| resolver.get_secret(id))
            .find(|value| !value.is_empty())
    }
}
