//! Test utilities for plugdeps
//!
//! This module provides helpers for writing tests against a realistic, but
//! throwaway, host installation:
//! - [`ClaudeHomeFixture`] writes the install registry, the settings, the
//!   known-marketplace registry, plugin manifests and marketplace catalogs
//!   into a temporary directory
//! - [`MockProber`] and [`MockCatalogFetcher`] stand in for the system and
//!   the network
//!
//! # Example
//!
//! ```rust,no_run
//! use plugdeps_cli::state::InstallationState;
//! use plugdeps_cli::test_utils::ClaudeHomeFixture;
//!
//! # async fn example() {
//! let home = ClaudeHomeFixture::new()
//!     .marketplace("acme")
//!     .installed("bug-fixes", "acme", "0.3.1", true)
//!     .manifest("my-plugin", "acme", r#"{"dependencies": {"bug-fixes": "^0.3.0"}}"#)
//!     .write();
//!
//! let state = InstallationState::collect(&home.paths()).await;
//! # }
//! ```

use crate::config::ClaudePaths;
use crate::core::PlugdepsError;
use crate::manifest::{MANIFEST_FILE_NAME, PLUGIN_METADATA_DIR};
use crate::probe::{ProbeResult, Prober};
use crate::state::catalog::{CATALOG_FILE_NAME, CatalogFetcher, MarketplaceCatalog};
use crate::state::MarketplaceRegistry;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without logging.
///
/// ```bash
/// RUST_LOG=resolver=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

#[derive(Debug, Clone)]
struct FixtureInstall {
    name: String,
    marketplace: String,
    version: Option<String>,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct FixtureCatalogEntry {
    name: String,
    version: Option<String>,
}

/// Builder for a temporary Claude home directory.
///
/// Marketplaces are checked out under `plugins/marketplaces/<name>` and
/// installed plugins live under `plugins/cache/<marketplace>/<name>`, the
/// same layout the host uses.
#[derive(Debug, Default)]
pub struct ClaudeHomeFixture {
    marketplaces: Vec<String>,
    installs: Vec<FixtureInstall>,
    enabled_only: Vec<String>,
    manifests: Vec<(String, String, String)>,
    catalogs: Vec<(String, Vec<FixtureCatalogEntry>)>,
}

impl ClaudeHomeFixture {
    /// Start an empty home.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a marketplace with a local checkout.
    #[must_use]
    pub fn marketplace(mut self, name: &str) -> Self {
        self.marketplaces.push(name.to_string());
        self
    }

    /// Record an installed plugin.
    #[must_use]
    pub fn installed(mut self, name: &str, marketplace: &str, version: &str, enabled: bool) -> Self {
        self.installs.push(FixtureInstall {
            name: name.to_string(),
            marketplace: marketplace.to_string(),
            version: Some(version.to_string()),
            enabled,
        });
        self
    }

    /// Record an installed plugin whose version the host did not record.
    #[must_use]
    pub fn installed_without_version(mut self, name: &str, marketplace: &str, enabled: bool) -> Self {
        self.installs.push(FixtureInstall {
            name: name.to_string(),
            marketplace: marketplace.to_string(),
            version: None,
            enabled,
        });
        self
    }

    /// Add an `enabledPlugins` entry without an install record.
    #[must_use]
    pub fn enabled_only(mut self, key: &str) -> Self {
        self.enabled_only.push(key.to_string());
        self
    }

    /// Give `name@marketplace` an `extends-plugin.json`.
    ///
    /// Installed plugins get it in their install directory; others get it
    /// in the marketplace checkout under `plugins/<name>`.
    #[must_use]
    pub fn manifest(mut self, name: &str, marketplace: &str, content: &str) -> Self {
        self.manifests.push((name.to_string(), marketplace.to_string(), content.to_string()));
        self
    }

    /// Publish a catalog for `marketplace`. `None` versions are omitted.
    #[must_use]
    pub fn catalog(mut self, marketplace: &str, plugins: &[(&str, Option<&str>)]) -> Self {
        let entries = plugins
            .iter()
            .map(|(name, version)| FixtureCatalogEntry {
                name: (*name).to_string(),
                version: version.map(str::to_string),
            })
            .collect();
        self.catalogs.push((marketplace.to_string(), entries));
        self
    }

    /// Write every file and return the home.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be written.
    #[must_use]
    pub fn write(self) -> ClaudeHome {
        let temp = TempDir::new().expect("create temp dir");
        let root = temp.path().join(".claude");
        let home = ClaudeHome {
            _temp: temp,
            root,
        };
        let paths = home.paths();
        std::fs::create_dir_all(paths.plugins_dir()).expect("create plugins dir");

        let mut known = Map::new();
        for name in &self.marketplaces {
            let location = home.marketplace_dir(name);
            std::fs::create_dir_all(&location).expect("create marketplace dir");
            known.insert(
                name.clone(),
                json!({
                    "installLocation": location,
                    "source": { "source": "directory", "path": location },
                }),
            );
        }
        write_json(&paths.known_marketplaces(), &Value::Object(known));

        let mut plugins = Map::new();
        let mut enabled = Map::new();
        for install in &self.installs {
            let key = format!("{}@{}", install.name, install.marketplace);
            let install_path = home.install_dir(&install.name, &install.marketplace);
            std::fs::create_dir_all(&install_path).expect("create install dir");

            let mut record = json!({ "scope": "user", "installPath": install_path });
            if let Some(version) = &install.version {
                record["version"] = json!(version);
            }
            plugins.insert(key.clone(), json!([record]));
            enabled.insert(key, json!(install.enabled));
        }
        for key in &self.enabled_only {
            enabled.insert(key.clone(), json!(true));
        }
        write_json(&paths.installed_plugins(), &json!({ "version": 2, "plugins": plugins }));
        write_json(&paths.settings(), &json!({ "enabledPlugins": enabled }));

        for (name, marketplace, content) in &self.manifests {
            let installed =
                self.installs.iter().any(|i| &i.name == name && &i.marketplace == marketplace);
            let plugin_dir = if installed {
                home.install_dir(name, marketplace)
            } else {
                home.marketplace_dir(marketplace).join("plugins").join(name)
            };
            let path = plugin_dir.join(PLUGIN_METADATA_DIR).join(MANIFEST_FILE_NAME);
            std::fs::create_dir_all(path.parent().expect("manifest has a parent"))
                .expect("create manifest dir");
            std::fs::write(&path, content).expect("write manifest");
        }

        for (marketplace, entries) in &self.catalogs {
            let listed: Vec<Value> = entries
                .iter()
                .map(|entry| {
                    let mut plugin = json!({
                        "name": entry.name,
                        "source": format!("./plugins/{}", entry.name),
                    });
                    if let Some(version) = &entry.version {
                        plugin["version"] = json!(version);
                    }
                    plugin
                })
                .collect();
            let path = home
                .marketplace_dir(marketplace)
                .join(PLUGIN_METADATA_DIR)
                .join(CATALOG_FILE_NAME);
            write_json(&path, &json!({ "name": marketplace, "plugins": listed }));
        }

        home
    }
}

fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    let content = serde_json::to_string_pretty(value).expect("serialize fixture");
    std::fs::write(path, content).expect("write fixture file");
}

/// A written fixture. The directory is removed on drop.
#[derive(Debug)]
pub struct ClaudeHome {
    _temp: TempDir,
    root: PathBuf,
}

impl ClaudeHome {
    /// The Claude config dir.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derived paths under [`Self::root`].
    #[must_use]
    pub fn paths(&self) -> ClaudePaths {
        ClaudePaths::new(&self.root)
    }

    /// Local checkout of `marketplace`.
    #[must_use]
    pub fn marketplace_dir(&self, marketplace: &str) -> PathBuf {
        self.root.join("plugins").join("marketplaces").join(marketplace)
    }

    /// Install directory of `name@marketplace`.
    #[must_use]
    pub fn install_dir(&self, name: &str, marketplace: &str) -> PathBuf {
        self.root.join("plugins").join("cache").join(marketplace).join(name)
    }
}

/// A [`Prober`] answering from a fixed table. Unlisted commands are missing.
#[derive(Debug, Default, Clone)]
pub struct MockProber {
    results: HashMap<String, ProbeResult>,
    calls: Arc<AtomicUsize>,
}

impl MockProber {
    /// Start with every command missing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `command` report `result`.
    #[must_use]
    pub fn with(mut self, command: &str, result: ProbeResult) -> Self {
        self.results.insert(command.to_string(), result);
        self
    }

    /// Shared counter of probes performed.
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Prober for MockProber {
    async fn probe(&self, command: &str) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.get(command).cloned().unwrap_or_else(ProbeResult::missing)
    }
}

/// A [`CatalogFetcher`] serving in-memory catalog documents.
#[derive(Debug, Default, Clone)]
pub struct MockCatalogFetcher {
    catalogs: HashMap<String, Result<String, String>>,
    fetches: Arc<AtomicUsize>,
}

impl MockCatalogFetcher {
    /// Start with every fetch failing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` as the catalog of `marketplace`.
    #[must_use]
    pub fn with_catalog(mut self, marketplace: &str, content: &str) -> Self {
        self.catalogs.insert(marketplace.to_string(), Ok(content.to_string()));
        self
    }

    /// Fail fetches of `marketplace` with `reason`.
    #[must_use]
    pub fn with_failure(mut self, marketplace: &str, reason: &str) -> Self {
        self.catalogs.insert(marketplace.to_string(), Err(reason.to_string()));
        self
    }

    /// Shared counter of fetches performed.
    #[must_use]
    pub fn fetches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

impl CatalogFetcher for MockCatalogFetcher {
    async fn fetch(&self, marketplace: &MarketplaceRegistry) -> Result<MarketplaceCatalog, PlugdepsError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.catalogs.get(&marketplace.name) {
            Some(Ok(content)) => MarketplaceCatalog::parse(&marketplace.name, content),
            Some(Err(reason)) => Err(PlugdepsError::FetchError {
                marketplace: marketplace.name.clone(),
                reason: reason.clone(),
            }),
            None => Err(PlugdepsError::FetchError {
                marketplace: marketplace.name.clone(),
                reason: "no catalog served".to_string(),
            }),
        }
    }
}
