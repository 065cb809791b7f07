//! Persistent settings: CMS base URL and the API-key secret reference.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultpressError};
use crate::host::SecretResolver;

/// Default request timeout for CMS calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User settings, stored as TOML.
///
/// Missing keys fall back to their defaults, so a partial file loads as the
/// defaults with the given keys overridden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the CMS API (empty means unconfigured)
    pub cms_url: String,

    /// Id of the secret holding the API key (empty means unset)
    pub api_key_secret_id: String,

    /// Global timeout for each CMS request, in seconds
    pub request_timeout_secs: u64,

    /// Preferred editor for `vaultpress open` (falls back to $EDITOR if not set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cms_url: String::new(),
            api_key_secret_id: String::new(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            editor: None,
        }
    }
}

impl Settings {
    /// Directory holding vaultpress configuration (~/.config/vaultpress)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vaultpress"))
    }

    /// Get the config file path (~/.config/vaultpress/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load settings from `path`, or defaults if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| VaultpressError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save settings to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| VaultpressError::FileWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| VaultpressError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("saved settings to {}", path.display());
        Ok(())
    }

    /// Normalized base URL: trimmed, without trailing slashes. `None` when unset.
    pub fn base_url(&self) -> Option<String> {
        let url = self.cms_url.trim().trim_end_matches('/');
        (!url.is_empty()).then(|| url.to_string())
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Resolve the base URL and API key together.
    ///
    /// Returns `None` when either is missing or the secret is empty.
    pub fn credentials(&self, secrets: &dyn SecretResolver) -> Option<Credentials> {
        let secret_id = self.api_key_secret_id.trim();
        if secret_id.is_empty() {
            return None;
        }
        let api_key = secrets.get_secret(secret_id).filter(|key| !key.is_empty())?;
        let base_url = self.base_url()?;
        Some(Credentials { base_url, api_key })
    }
}

/// A base URL together with the resolved API key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Normalized base URL
    pub base_url: String,
    /// API key sent as `X-API-Key`
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct Secrets(HashMap<&'static str, &'static str>);

    impl SecretResolver for Secrets {
        fn get_secret(&self, id: &str) -> Option<String> {
            self.0.get(id).map(|s| s.to_string())
        }
    }

    fn configured() -> Settings {
        Settings {
            cms_url: "https://cms.example.com/api/".into(),
            api_key_secret_id: "cms-key".into(),
            ..Settings::default()
        }
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let settings: Settings = toml::from_str(r#"cms_url = "https://cms.example.com""#).unwrap();
        assert_eq!(settings.cms_url, "https://cms.example.com");
        assert_eq!(settings.api_key_secret_id, "");
        assert_eq!(settings.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        configured().save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), configured());
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            configured().base_url().as_deref(),
            Some("https://cms.example.com/api")
        );
        assert_eq!(Settings::default().base_url(), None);
    }

    #[test]
    fn credentials_require_url_and_secret() {
        let secrets = Secrets(HashMap::from([("cms-key", "k-123"), ("empty", "")]));

        let creds = configured().credentials(&secrets).unwrap();
        assert_eq!(creds.api_key, "k-123");
        assert_eq!(creds.base_url, "https://cms.example.com/api");

        let no_url = Settings {
            cms_url: "  ".into(),
            ..configured()
        };
        assert!(no_url.credentials(&secrets).is_none());

        let unknown_secret = Settings {
            api_key_secret_id: "missing".into(),
            ..configured()
        };
        assert!(unknown_secret.credentials(&secrets).is_none());

        let empty_secret = Settings {
            api_key_secret_id: "empty".into(),
            ..configured()
        };
        assert!(empty_secret.credentials(&secrets).is_none());
    }

    #[test]
    fn debug_output_hides_key() {
        let creds = Credentials {
            base_url: "https://x".into(),
            api_key: "super-secret".into(),
        };
        assert!(!format!("{:?}", creds).contains("super-secret"));
    }
}
