//! Installation state: what is installed, what is enabled, and where it came from.
//!
//! The host application spreads this information over several files that
//! are written independently and can disagree:
//!
//! | Source | Path (under the Claude dir) | Provides |
//! |--------|-----------------------------|----------|
//! | Install registry | `plugins/installed_plugins.json` | version, scope, install path |
//! | Settings | `settings.json` | `enabledPlugins` |
//! | Known marketplaces | `plugins/known_marketplaces.json` | marketplace locations and sources |
//! | Catalogs | `<marketplace>/.claude-plugin/marketplace.json` | available plugins |
//!
//! [`InstallationState::collect`] reads the first three in parallel and
//! merges them into one snapshot. Catalogs are attached later, and only for
//! the marketplaces a failing dependency actually needs.
//!
//! # Merge Rules
//!
//! - A plugin is installed iff the install registry has a record for it
//! - A plugin with no `enabledPlugins` entry is disabled
//! - `enabledPlugins` entries for plugins that are not installed are ignored
//! - The install registry is authoritative for versions
//! - Absent files are empty sources; malformed files are logged and empty

pub mod catalog;
pub mod sources;

pub use catalog::{
    CatalogFetcher, CatalogPlugin, HttpCatalogFetcher, LocalCatalogFetcher, MarketplaceCatalog,
};
pub use sources::{InstallEntry, MarketplaceRegistry, MarketplaceSource};

use crate::config::ClaudePaths;
use crate::core::PlugdepsError;
use crate::models::{InstallScope, PluginReference};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// An installed plugin, merged from the install and settings registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPluginRecord {
    /// Plugin name
    pub name: String,
    /// Marketplace the plugin was installed from
    pub marketplace: String,
    /// Installed version, when the host recorded one
    pub version: Option<String>,
    /// Install scope
    pub scope: InstallScope,
    /// Whether the plugin is enabled
    pub enabled: bool,
    /// Install directory, when the host recorded one
    pub install_path: Option<PathBuf>,
}

impl InstalledPluginRecord {
    /// The `name@marketplace` reference of this plugin.
    #[must_use]
    pub fn reference(&self) -> PluginReference {
        PluginReference::new(&self.name, &self.marketplace)
    }
}

/// Outcome of looking a marketplace's catalog up.
#[derive(Debug, Clone)]
pub enum CatalogLookup {
    /// The catalog was fetched
    Loaded(MarketplaceCatalog),
    /// Fetching failed; the reason is kept for reporting
    Failed(String),
}

/// A catalog listing matched by [`InstallationState::find_available`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableCandidate {
    /// Marketplace that lists the plugin
    pub marketplace: String,
    /// Listed version
    pub version: Option<String>,
}

/// Result of [`InstallationState::find_available`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailableLookup {
    /// Every matching listing across the consulted catalogs (possibly none)
    Candidates(Vec<AvailableCandidate>),
    /// No listing matched and at least one consulted catalog could not be fetched
    Unknown(String),
}

/// Snapshot of the local plugin installation.
#[derive(Debug, Clone, Default)]
pub struct InstallationState {
    records: BTreeMap<(String, String), InstalledPluginRecord>,
    marketplaces: BTreeMap<String, MarketplaceRegistry>,
    catalogs: BTreeMap<String, CatalogLookup>,
}

impl InstallationState {
    /// Read and merge the host's registries under `paths`.
    ///
    /// Never fails: unreadable sources are logged and treated as empty.
    pub async fn collect(paths: &ClaudePaths) -> Self {
        let installed_path = paths.installed_plugins();
        let settings_path = paths.settings();
        let marketplaces_path = paths.known_marketplaces();

        let (installed, settings, marketplaces) = tokio::join!(
            sources::read_json_source(&installed_path, "install registry"),
            sources::read_json_source(&settings_path, "settings"),
            sources::read_json_source(&marketplaces_path, "known-marketplace registry"),
        );

        let installs = installed.map(sources::parse_install_registry).unwrap_or_default();
        let enabled = settings.map(sources::parse_enabled_plugins).unwrap_or_default();
        let marketplaces = marketplaces.map(sources::parse_known_marketplaces).unwrap_or_default();

        let state = Self::from_sources(installs, &enabled, marketplaces);
        debug!(
            target: "state",
            "collected {} installed plugin(s) across {} known marketplace(s)",
            state.records.len(),
            state.marketplaces.len()
        );
        state
    }

    /// Merge already-parsed sources.
    #[must_use]
    pub fn from_sources(
        installs: BTreeMap<String, InstallEntry>,
        enabled: &BTreeMap<String, bool>,
        marketplaces: BTreeMap<String, MarketplaceRegistry>,
    ) -> Self {
        let mut records = BTreeMap::new();
        for (key, entry) in installs {
            let (name, marketplace) = match PluginReference::parse(&key) {
                Ok(PluginReference {
                    name,
                    marketplace: Some(marketplace),
                }) => (name, marketplace),
                _ => {
                    tracing::warn!(target: "state", "install record '{key}' is not a name@marketplace key, skipping it");
                    continue;
                }
            };

            let record = InstalledPluginRecord {
                name: name.clone(),
                marketplace: marketplace.clone(),
                version: entry.version,
                scope: entry.scope,
                enabled: enabled.get(&key).copied().unwrap_or(false),
                install_path: entry.install_path,
            };
            records.insert((name, marketplace), record);
        }

        Self {
            records,
            marketplaces,
            catalogs: BTreeMap::new(),
        }
    }

    /// Installed plugins matching `reference`, ordered by key.
    ///
    /// A qualified reference yields at most one record; an unqualified one
    /// may yield several when the same name is installed from different
    /// marketplaces.
    #[must_use]
    pub fn find_installed(&self, reference: &PluginReference) -> Vec<&InstalledPluginRecord> {
        self.records
            .values()
            .filter(|record| reference.matches(&record.name, &record.marketplace))
            .collect()
    }

    /// Every installed plugin, ordered by key.
    pub fn installed(&self) -> impl Iterator<Item = &InstalledPluginRecord> {
        self.records.values()
    }

    /// Whether `name` is a known marketplace.
    #[must_use]
    pub fn is_marketplace_known(&self, name: &str) -> bool {
        self.marketplaces.contains_key(name)
    }

    /// Look a known marketplace up.
    #[must_use]
    pub fn marketplace(&self, name: &str) -> Option<&MarketplaceRegistry> {
        self.marketplaces.get(name)
    }

    /// Every known marketplace, ordered by name.
    pub fn marketplaces(&self) -> impl Iterator<Item = &MarketplaceRegistry> {
        self.marketplaces.values()
    }

    /// Whether the catalog of `marketplace` has already been looked up.
    #[must_use]
    pub fn has_catalog(&self, marketplace: &str) -> bool {
        self.catalogs.contains_key(marketplace)
    }

    /// Attach the outcome of fetching a marketplace's catalog.
    pub fn insert_catalog(
        &mut self,
        marketplace: &str,
        result: Result<MarketplaceCatalog, PlugdepsError>,
    ) {
        let lookup = match result {
            Ok(catalog) => CatalogLookup::Loaded(catalog),
            Err(e) => CatalogLookup::Failed(e.to_string()),
        };
        self.catalogs.insert(marketplace.to_string(), lookup);
    }

    /// Catalog listings matching `reference` among the attached catalogs.
    ///
    /// A qualified reference consults only its own marketplace; an
    /// unqualified one consults every attached catalog. Catalogs that were
    /// never attached are not consulted.
    #[must_use]
    pub fn find_available(&self, reference: &PluginReference) -> AvailableLookup {
        let mut candidates = Vec::new();
        let mut failures = Vec::new();

        let consulted = self.catalogs.iter().filter(|(name, _)| {
            reference.marketplace.as_deref().is_none_or(|wanted| wanted == name.as_str())
        });

        for (marketplace, lookup) in consulted {
            match lookup {
                CatalogLookup::Loaded(catalog) => {
                    candidates.extend(catalog.find(&reference.name).map(|plugin| {
                        AvailableCandidate {
                            marketplace: marketplace.clone(),
                            version: plugin.version.clone(),
                        }
                    }));
                }
                CatalogLookup::Failed(reason) => failures.push(reason.clone()),
            }
        }

        if candidates.is_empty() && !failures.is_empty() {
            AvailableLookup::Unknown(failures.join("; "))
        } else {
            AvailableLookup::Candidates(candidates)
        }
    }

    /// Installed plugin names closest to `input`, best first.
    ///
    /// Used for "did you mean" suggestions.
    #[must_use]
    pub fn suggest_installed(&self, input: &str) -> Option<String> {
        let wanted = input.split_once('@').map_or(input, |(name, _)| name);
        self.records
            .values()
            .map(|record| {
                let key = record.reference().to_string();
                (strsim::jaro_winkler(wanted, &record.name), key)
            })
            .filter(|(score, _)| *score >= 0.8)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, key)| key)
    }
}
