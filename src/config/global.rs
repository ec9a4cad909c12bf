//! User-wide configuration for plugdeps.
//!
//! The configuration file is optional. Every field has a default, so a
//! missing file, an empty file and a file that sets only one field are all
//! valid.
//!
//! # Location
//!
//! - Unix/macOS: `~/.plugdeps/config.toml`
//! - Windows: `%LOCALAPPDATA%\plugdeps\config.toml`
//!
//! The location can be overridden with `--config` or the `PLUGDEPS_CONFIG`
//! environment variable.
//!
//! # File Format
//!
//! ```toml
//! # Claude configuration directory (default: $CLAUDE_CONFIG_DIR or ~/.claude)
//! claude_dir = "~/.claude"
//!
//! # Seconds to wait for `<command> --version`
//! probe_timeout_secs = 5
//!
//! # Flags tried in order when probing a system command's version
//! version_flags = ["--version", "-v"]
//!
//! # Fetch marketplace catalogs over the network when a local check fails
//! remote_catalogs = true
//! fetch_timeout_secs = 10
//! ```

use crate::core::PlugdepsError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Environment variable the host application uses to relocate its config directory.
pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

const fn default_probe_timeout_secs() -> u64 {
    5
}

const fn default_fetch_timeout_secs() -> u64 {
    10
}

const fn default_remote_catalogs() -> bool {
    true
}

fn default_version_flags() -> Vec<String> {
    vec!["--version".to_string(), "-v".to_string()]
}

/// Global configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Claude configuration directory. `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_dir: Option<String>,

    /// Per-invocation timeout for version probes, in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Version flags tried in order; the first output with a version wins.
    #[serde(default = "default_version_flags")]
    pub version_flags: Vec<String>,

    /// Whether remote marketplace catalogs may be fetched.
    #[serde(default = "default_remote_catalogs")]
    pub remote_catalogs: bool,

    /// Timeout for a single catalog fetch, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            claude_dir: None,
            probe_timeout_secs: default_probe_timeout_secs(),
            version_flags: default_version_flags(),
            remote_catalogs: default_remote_catalogs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl GlobalConfig {
    /// Load from `path`, or from [`Self::default_path`] when `None`.
    ///
    /// A file that does not exist yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, is not valid
    /// TOML, or fails [`Self::validate`].
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match Self::default_path() {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!(target: "config", "no default config location: {e}");
                    return Ok(Self::default());
                }
            },
        };

        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            tracing::debug!(target: "config", "no config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds
    /// invalid values.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;

        tracing::debug!(target: "config", "loaded config from {}", path.display());
        Ok(config)
    }

    /// Default location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or, on Windows, local data) directory
    /// cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("plugdeps")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".plugdeps")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Reject values no run could work with.
    ///
    /// # Errors
    ///
    /// Returns [`PlugdepsError::ConfigError`] for zero timeouts or an empty
    /// flag list.
    pub fn validate(&self) -> Result<(), PlugdepsError> {
        if self.probe_timeout_secs == 0 {
            return Err(PlugdepsError::ConfigError {
                message: "probe_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(PlugdepsError::ConfigError {
                message: "fetch_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.version_flags.iter().all(|flag| flag.trim().is_empty()) {
            return Err(PlugdepsError::ConfigError {
                message: "version_flags must list at least one flag".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the Claude configuration directory.
    ///
    /// Order: the `claude_dir` field, then `$CLAUDE_CONFIG_DIR`, then
    /// `~/.claude`.
    ///
    /// # Errors
    ///
    /// Returns [`PlugdepsError::ConfigError`] when `~` cannot be expanded or
    /// no home directory exists.
    pub fn claude_dir(&self) -> Result<PathBuf, PlugdepsError> {
        if let Some(dir) = &self.claude_dir {
            return expand_path(dir);
        }

        if let Ok(dir) = std::env::var(CLAUDE_CONFIG_DIR_ENV)
            && !dir.trim().is_empty()
        {
            return expand_path(&dir);
        }

        dirs::home_dir().map(|home| home.join(".claude")).ok_or_else(|| {
            PlugdepsError::ConfigError {
                message: "Unable to determine home directory for ~/.claude".to_string(),
            }
        })
    }

    /// Probe timeout as a [`Duration`].
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Catalog fetch timeout as a [`Duration`].
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn expand_path(raw: &str) -> Result<PathBuf, PlugdepsError> {
    shellexpand::full(raw).map(|expanded| PathBuf::from(expanded.as_ref())).map_err(|e| {
        PlugdepsError::ConfigError {
            message: format!("Cannot expand path '{raw}': {e}"),
        }
    })
}
