//! Locations of the host application's files.

use std::path::{Path, PathBuf};

/// Paths derived from the Claude configuration directory.
///
/// ```text
/// <root>/
/// ├── settings.json                    enabledPlugins
/// └── plugins/
///     ├── installed_plugins.json       install registry
///     └── known_marketplaces.json      marketplace registry
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudePaths {
    root: PathBuf,
}

impl ClaudePaths {
    /// Create paths rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// The Claude configuration directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `plugins/` directory.
    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }

    /// Install registry.
    #[must_use]
    pub fn installed_plugins(&self) -> PathBuf {
        self.plugins_dir().join("installed_plugins.json")
    }

    /// Enabled-state registry.
    #[must_use]
    pub fn settings(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Known-marketplace registry.
    #[must_use]
    pub fn known_marketplaces(&self) -> PathBuf {
        self.plugins_dir().join("known_marketplaces.json")
    }
}
