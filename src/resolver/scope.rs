//! Selecting which plugins' manifests a run checks.
//!
//! | Scope | Plugins |
//! |-------|---------|
//! | `enabled` | installed and enabled |
//! | `installed` | installed |
//! | `all` | installed, plus every plugin a local marketplace checkout offers |
//!
//! A [`ScopeFilter`] then narrows the selection to one plugin or one
//! marketplace. Plugins are returned ordered by `name@marketplace` so that
//! two runs over the same state produce the same report.

use crate::core::PlugdepsError;
use crate::manifest::PLUGIN_METADATA_DIR;
use crate::models::{PluginReference, ScopeFilter, ScopeKind, ScopeSelector};
use crate::state::catalog::read_local_catalog;
use crate::state::{InstallationState, InstalledPluginRecord, MarketplaceRegistry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A plugin whose manifest will be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPlugin {
    /// `name@marketplace`
    pub reference: PluginReference,
    /// Directory holding the plugin's `.claude-plugin` folder, if known
    pub dir: Option<PathBuf>,
}

/// Resolve a selector against the installation.
///
/// # Errors
///
/// Returns [`PlugdepsError::PluginNotFound`] when a plugin filter names a
/// plugin that is neither installed nor (for `all`) offered by any local
/// marketplace. A plugin that exists but falls outside the base scope (for
/// example a disabled plugin under `enabled`) yields an empty selection.
pub async fn select_plugins(
    selector: &ScopeSelector,
    state: &InstallationState,
) -> Result<Vec<ScopedPlugin>, PlugdepsError> {
    let mut selected: BTreeMap<(String, String), ScopedPlugin> = BTreeMap::new();

    for record in state.installed() {
        if selector.kind == ScopeKind::Enabled && !record.enabled {
            continue;
        }
        selected.insert(key(&record.name, &record.marketplace), installed_plugin(record, state));
    }

    if selector.kind == ScopeKind::All {
        for marketplace in state.marketplaces() {
            for plugin in offered_plugins(marketplace).await {
                let Some(marketplace_name) = plugin.reference.marketplace.clone() else {
                    continue;
                };
                selected.entry(key(&plugin.reference.name, &marketplace_name)).or_insert(plugin);
            }
        }
    }

    let total = selected.len();
    let plugins: Vec<ScopedPlugin> = selected
        .into_iter()
        .filter(|((name, marketplace), _)| selector.admits(name, marketplace))
        .map(|(_, plugin)| plugin)
        .collect();

    debug!(
        target: "resolver",
        "scope '{}' selected {} of {total} plugin(s)",
        selector.kind,
        plugins.len()
    );

    if plugins.is_empty() {
        match &selector.filter {
            ScopeFilter::Plugin(reference) => {
                if state.find_installed(reference).is_empty() {
                    return Err(PlugdepsError::PluginNotFound {
                        name: reference.to_string(),
                        suggestion: state.suggest_installed(&reference.to_string()),
                    });
                }
                warn!(target: "resolver", "plugin '{reference}' is installed but not in scope '{}'", selector.kind);
            }
            ScopeFilter::Marketplace(name) if !state.is_marketplace_known(name) => {
                warn!(target: "resolver", "marketplace '{name}' is not known");
            }
            _ => {}
        }
    }

    Ok(plugins)
}

fn key(name: &str, marketplace: &str) -> (String, String) {
    (name.to_string(), marketplace.to_string())
}

fn installed_plugin(record: &InstalledPluginRecord, state: &InstallationState) -> ScopedPlugin {
    let dir = record.install_path.clone().or_else(|| {
        state
            .marketplace(&record.marketplace)
            .and_then(|m| m.location.as_ref())
            .map(|location| location.join("plugins").join(&record.name))
    });

    if dir.is_none() {
        debug!(target: "resolver", "no directory known for '{}', it declares no dependencies", record.reference());
    }

    ScopedPlugin {
        reference: record.reference(),
        dir,
    }
}

/// Plugins offered by a marketplace's local checkout: its catalog listings
/// plus any `plugins/*` directory carrying plugin metadata.
async fn offered_plugins(marketplace: &MarketplaceRegistry) -> Vec<ScopedPlugin> {
    let Some(location) = marketplace.location.clone() else {
        return Vec::new();
    };

    let mut offered: BTreeMap<String, PathBuf> = BTreeMap::new();

    match read_local_catalog(marketplace).await {
        Ok(catalog) => {
            for plugin in catalog.plugins {
                let dir = match &plugin.source_path {
                    Some(source) => location.join(source),
                    None => location.join("plugins").join(&plugin.name),
                };
                offered.entry(plugin.name).or_insert(dir);
            }
        }
        Err(e) => debug!(target: "resolver", "{e}"),
    }

    let plugins_dir = location.join("plugins");
    let scanned =
        tokio::task::spawn_blocking(move || plugin_dirs(&plugins_dir)).await.unwrap_or_default();
    for (name, dir) in scanned {
        offered.entry(name).or_insert(dir);
    }

    offered
        .into_iter()
        .map(|(name, dir)| ScopedPlugin {
            reference: PluginReference::new(name, &marketplace.name),
            dir: Some(dir),
        })
        .collect()
}

fn plugin_dirs(plugins_dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(plugins_dir) else {
        return Vec::new();
    };

    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.join(PLUGIN_METADATA_DIR).is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            Some((name, path))
        })
        .collect()
}
