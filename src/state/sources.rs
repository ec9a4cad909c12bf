//! On-disk formats of the host's plugin registries.
//!
//! Each source is read independently and tolerates absence: a missing file
//! is an empty source. A file that exists but cannot be read or parsed is
//! logged and also treated as empty, so one corrupt registry never hides
//! the others.

use crate::models::InstallScope;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One install of a plugin as recorded by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallEntry {
    /// Installed version, absent for some git installs
    #[serde(default)]
    pub version: Option<String>,

    /// Install scope
    #[serde(default)]
    pub scope: InstallScope,

    /// Directory the plugin was unpacked into
    #[serde(default)]
    pub install_path: Option<PathBuf>,
}

/// A registry value: a single install or a list of installs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum InstallEntries {
    Many(Vec<InstallEntry>),
    One(InstallEntry),
}

/// Parse the install registry.
///
/// Accepts both the bare mapping `{"name@mkt": {version, scope}}` and the
/// host's wrapped form `{"version": 2, "plugins": {"name@mkt": [ ... ]}}`.
/// When a key maps to several installs the last one wins. Keys whose value
/// cannot be interpreted are skipped with a warning.
#[must_use]
pub fn parse_install_registry(root: Value) -> BTreeMap<String, InstallEntry> {
    let entries = match root {
        Value::Object(mut map) => match map.remove("plugins") {
            Some(Value::Object(plugins)) => plugins,
            Some(other) => {
                // Not the wrapped form; "plugins" was an ordinary key
                map.insert("plugins".to_string(), other);
                map
            }
            None => map,
        },
        _ => {
            warn!(target: "state", "install registry is not a JSON object, ignoring it");
            return BTreeMap::new();
        }
    };

    let mut installs = BTreeMap::new();
    for (key, value) in entries {
        match serde_json::from_value::<InstallEntries>(value) {
            Ok(InstallEntries::One(entry)) => {
                installs.insert(key, entry);
            }
            Ok(InstallEntries::Many(list)) => {
                if let Some(entry) = list.into_iter().last() {
                    installs.insert(key, entry);
                }
            }
            Err(e) => warn!(target: "state", "skipping install record '{key}': {e}"),
        }
    }
    installs
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    #[serde(default, rename = "enabledPlugins")]
    enabled_plugins: BTreeMap<String, Value>,
}

/// Parse `enabledPlugins` out of the host settings.
///
/// Non-boolean values are treated as disabled.
#[must_use]
pub fn parse_enabled_plugins(root: Value) -> BTreeMap<String, bool> {
    match serde_json::from_value::<Settings>(root) {
        Ok(settings) => settings
            .enabled_plugins
            .into_iter()
            .map(|(key, value)| (key, value.as_bool().unwrap_or(false)))
            .collect(),
        Err(e) => {
            warn!(target: "state", "settings have an unexpected shape: {e}");
            BTreeMap::new()
        }
    }
}

/// Where a marketplace's catalog comes from upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum MarketplaceSource {
    /// A GitHub repository, `owner/name`
    Github {
        /// Repository slug
        repo: String,
    },
    /// An arbitrary git remote
    Git {
        /// Clone URL
        url: String,
    },
    /// A direct URL to a catalog document or repository
    Url {
        /// Location
        url: String,
    },
    /// A directory on this machine
    Directory {
        /// Location
        path: PathBuf,
    },
    /// Only a local copy is known
    #[default]
    #[serde(other)]
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawMarketplaceEntry {
    Location(String),
    Detailed(DetailedMarketplaceEntry),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailedMarketplaceEntry {
    #[serde(default)]
    install_location: Option<PathBuf>,
    #[serde(default)]
    source: Option<Value>,
}

/// A marketplace the host knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceRegistry {
    /// Marketplace name
    pub name: String,
    /// Local checkout of the marketplace, if any
    pub location: Option<PathBuf>,
    /// Upstream source
    pub source: MarketplaceSource,
}

/// Parse the known-marketplace registry.
///
/// Entries may be a bare location string or an object with
/// `installLocation` and `source`. An unrecognized `source` degrades to
/// [`MarketplaceSource::Local`] rather than dropping the marketplace.
#[must_use]
pub fn parse_known_marketplaces(root: Value) -> BTreeMap<String, MarketplaceRegistry> {
    let Value::Object(entries) = root else {
        warn!(target: "state", "known-marketplace registry is not a JSON object, ignoring it");
        return BTreeMap::new();
    };

    let mut marketplaces = BTreeMap::new();
    for (name, value) in entries {
        let registry = match serde_json::from_value::<RawMarketplaceEntry>(value) {
            Ok(RawMarketplaceEntry::Location(location)) => MarketplaceRegistry {
                name: name.clone(),
                location: Some(PathBuf::from(location)),
                source: MarketplaceSource::Local,
            },
            Ok(RawMarketplaceEntry::Detailed(entry)) => {
                let source = entry
                    .source
                    .map(|raw| {
                        serde_json::from_value::<MarketplaceSource>(raw).unwrap_or_else(|e| {
                            debug!(target: "state", "marketplace '{name}' has an unrecognized source: {e}");
                            MarketplaceSource::Local
                        })
                    })
                    .unwrap_or_default();
                MarketplaceRegistry {
                    name: name.clone(),
                    location: entry.install_location,
                    source,
                }
            }
            Err(e) => {
                warn!(target: "state", "skipping marketplace '{name}': {e}");
                continue;
            }
        };
        marketplaces.insert(name, registry);
    }
    marketplaces
}

/// Read a JSON source file.
///
/// Returns `None` when the file is absent, unreadable or malformed; the
/// latter two are logged.
pub async fn read_json_source(path: &Path, label: &str) -> Option<Value> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(target: "state", "{label} not found at {}, treating as empty", path.display());
            return None;
        }
        Err(e) => {
            warn!(target: "state", "failed to read {label} at {}: {e}", path.display());
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => {
            debug!(target: "state", "read {label} from {}", path.display());
            Some(value)
        }
        Err(e) => {
            warn!(target: "state", "failed to parse {label} at {}: {e}", path.display());
            None
        }
    }
}
