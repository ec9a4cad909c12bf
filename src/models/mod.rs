//! Shared data models for plugdeps
//!
//! These types are used by the manifest loader, the installation state
//! collector, the resolver and the CLI alike.

use crate::core::PlugdepsError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A reference to a plugin, optionally qualified by its marketplace.
///
/// Written as `name@marketplace` or just `name`. The key is split on the
/// **first** `@`, so `tool@acme@mirror` names plugin `tool` in marketplace
/// `acme@mirror`. An unqualified reference (`marketplace: None`) matches a
/// plugin of that name from any marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginReference {
    /// Plugin name
    pub name: String,
    /// Marketplace the plugin comes from, if specified
    pub marketplace: Option<String>,
}

impl PluginReference {
    /// Create a fully-qualified reference.
    pub fn new(name: impl Into<String>, marketplace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marketplace: Some(marketplace.into()),
        }
    }

    /// Create a reference that matches `name` in any marketplace.
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marketplace: None,
        }
    }

    /// Parse a `name[@marketplace]` key.
    ///
    /// # Errors
    ///
    /// Returns [`PlugdepsError::InvalidPluginReference`] when the name or the
    /// marketplace part is empty.
    pub fn parse(input: &str) -> Result<Self, PlugdepsError> {
        let trimmed = input.trim();
        let invalid = || PlugdepsError::InvalidPluginReference {
            input: input.to_string(),
        };

        match trimmed.split_once('@') {
            Some((name, marketplace)) => {
                if name.is_empty() || marketplace.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::new(name, marketplace))
            }
            None if trimmed.is_empty() => Err(invalid()),
            None => Ok(Self::unqualified(trimmed)),
        }
    }

    /// Whether a plugin installed as `name@marketplace` satisfies this reference.
    #[must_use]
    pub fn matches(&self, name: &str, marketplace: &str) -> bool {
        self.name == name && self.marketplace.as_deref().is_none_or(|m| m == marketplace)
    }
}

impl fmt::Display for PluginReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.marketplace {
            Some(marketplace) => write!(f, "{}@{}", self.name, marketplace),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for PluginReference {
    type Err = PlugdepsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PluginReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PluginReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Where a plugin was installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallScope {
    /// Installed for the current user
    #[default]
    User,
    /// Installed for a project and shared through version control
    Project,
    /// Installed for a project, local to this machine
    Local,
    /// A scope written by a newer host that this tool does not know
    #[serde(other)]
    Unknown,
}

/// Which plugins' manifests are checked in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Installed plugins that are enabled
    #[default]
    Enabled,
    /// Every installed plugin, enabled or not
    Installed,
    /// Every installed plugin plus every plugin listed in a local catalog
    All,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "enabled",
            Self::Installed => "installed",
            Self::All => "all",
        })
    }
}

/// Optional narrowing applied on top of a [`ScopeKind`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScopeFilter {
    /// No narrowing
    #[default]
    None,
    /// Only the plugin(s) matching this reference
    Plugin(PluginReference),
    /// Only plugins from this marketplace
    Marketplace(String),
}

/// A scope selector: the base scope plus an optional filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeSelector {
    /// Base scope
    pub kind: ScopeKind,
    /// Narrowing filter
    pub filter: ScopeFilter,
}

impl ScopeSelector {
    /// Create a selector with no filter.
    #[must_use]
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            filter: ScopeFilter::None,
        }
    }

    /// Narrow the selector with a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ScopeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Whether a plugin `name@marketplace` passes the filter.
    #[must_use]
    pub fn admits(&self, name: &str, marketplace: &str) -> bool {
        match &self.filter {
            ScopeFilter::None => true,
            ScopeFilter::Plugin(reference) => reference.matches(name, marketplace),
            ScopeFilter::Marketplace(wanted) => wanted == marketplace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plugin_reference() {
        let reference = PluginReference::parse("bug-fixes@aaronbassett-marketplace").unwrap();
        assert_eq!(reference.name, "bug-fixes");
        assert_eq!(reference.marketplace.as_deref(), Some("aaronbassett-marketplace"));

        let reference = PluginReference::parse("linter").unwrap();
        assert_eq!(reference.marketplace, None);
    }

    #[test]
    fn test_parse_splits_on_first_at() {
        let reference = PluginReference::parse("tool@acme@mirror").unwrap();
        assert_eq!(reference.name, "tool");
        assert_eq!(reference.marketplace.as_deref(), Some("acme@mirror"));
        assert_eq!(reference.to_string(), "tool@acme@mirror");
    }

    #[test]
    fn test_parse_rejects_empty_parts() {
        for bad in ["", "  ", "@mkt", "name@"] {
            assert!(
                matches!(
                    PluginReference::parse(bad),
                    Err(PlugdepsError::InvalidPluginReference { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_reference_matching() {
        let qualified = PluginReference::new("a", "m1");
        assert!(qualified.matches("a", "m1"));
        assert!(!qualified.matches("a", "m2"));

        let unqualified = PluginReference::unqualified("a");
        assert!(unqualified.matches("a", "m1"));
        assert!(unqualified.matches("a", "m2"));
        assert!(!unqualified.matches("b", "m1"));
    }

    #[test]
    fn test_reference_serializes_as_key() {
        let json = serde_json::to_string(&PluginReference::new("a", "m")).unwrap();
        assert_eq!(json, "\"a@m\"");
        let back: PluginReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PluginReference::new("a", "m"));
    }

    #[test]
    fn test_unknown_install_scope_is_tolerated() {
        let scope: InstallScope = serde_json::from_str("\"managed\"").unwrap();
        assert_eq!(scope, InstallScope::Unknown);
        let scope: InstallScope = serde_json::from_str("\"local\"").unwrap();
        assert_eq!(scope, InstallScope::Local);
    }

    #[test]
    fn test_scope_selector_admits() {
        let selector = ScopeSelector::new(ScopeKind::Installed)
            .with_filter(ScopeFilter::Marketplace("m1".to_string()));
        assert!(selector.admits("a", "m1"));
        assert!(!selector.admits("a", "m2"));

        assert!(ScopeSelector::default().admits("anything", "anywhere"));
    }
}
