//! Per-dependency verdicts and the report that collects them.
//!
//! These types are the JSON contract of `plugdeps check` and the input of
//! `plugdeps steps`, so their serialized shape is part of the public
//! interface. Fields are camelCase. Plugin results carry `plugin` and
//! `marketplace`; system results carry `command` instead.

use crate::manifest::Section;
use crate::models::{PluginReference, ScopeKind};
use crate::resolution::ResolutionAction;
use serde::{Deserialize, Serialize};

/// What a result is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    /// Another plugin
    Plugin {
        /// Plugin name
        plugin: String,
        /// Marketplace, `null` for an unqualified reference
        marketplace: Option<String>,
    },
    /// An executable on `PATH`
    System {
        /// Executable name
        command: String,
    },
}

impl Subject {
    /// Subject for a plugin reference.
    #[must_use]
    pub fn plugin(reference: &PluginReference) -> Self {
        Self::Plugin {
            plugin: reference.name.clone(),
            marketplace: reference.marketplace.clone(),
        }
    }

    /// Plugin or command name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Plugin {
                plugin,
                ..
            } => plugin,
            Self::System {
                command,
            } => command,
        }
    }

    /// Marketplace of a plugin subject.
    #[must_use]
    pub fn marketplace(&self) -> Option<&str> {
        match self {
            Self::Plugin {
                marketplace,
                ..
            } => marketplace.as_deref(),
            Self::System {
                ..
            } => None,
        }
    }

    /// Whether this is a system command.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }
}

/// Whether a plugin that fails its local check can be obtained elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Availability {
    /// No catalog was consulted for this result
    #[default]
    NotChecked,
    /// A catalog offers the plugin (for installed plugins: a version that
    /// satisfies the constraint)
    Available {
        /// Marketplace offering it
        marketplace: String,
        /// Version on offer
        version: Option<String>,
    },
    /// The consulted catalogs do not offer it
    Unavailable,
    /// A catalog could not be fetched
    Unknown {
        /// Why
        reason: String,
    },
    /// Several marketplaces offer a plugin of this name
    Ambiguous {
        /// Marketplaces offering it
        marketplaces: Vec<String>,
    },
}

/// Why a result is invalid beyond a plain version mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Issue {
    /// The constraint or the installed version is not valid syntax
    VersionParse {
        /// Parser message
        message: String,
    },
    /// Installed, but no version could be determined
    UnknownVersion,
    /// An unqualified reference matches several installed plugins
    AmbiguousReference {
        /// Every matching `name@marketplace`
        candidates: Vec<String>,
    },
}

/// Verdict for one declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// The dependency
    #[serde(flatten)]
    pub subject: Subject,

    /// Plugin whose manifest declared it
    pub dependent: PluginReference,

    /// Constraint as written in the manifest
    pub required_version: String,

    /// Whether the dependency is present
    pub installed: bool,

    /// Enabled state; `null` when not applicable (not installed, ambiguous, system)
    pub enabled: Option<bool>,

    /// Version found locally
    pub installed_version: Option<String>,

    /// Whether the installed version satisfies the constraint
    pub valid: bool,

    /// Manifest help text, or a generated explanation
    #[serde(default)]
    pub help: String,

    /// Whether the referenced marketplace is known; always true for
    /// unqualified references and system commands
    #[serde(default = "default_true")]
    pub marketplace_known: bool,

    /// Declared in an optional section
    #[serde(default)]
    pub optional: bool,

    /// Catalog availability
    #[serde(default)]
    pub availability: Availability,

    /// Extra reason for invalidity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,

    /// Recommended remediation, present with `--with-actions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ResolutionAction>,
}

const fn default_true() -> bool {
    true
}

impl CheckResult {
    /// Valid and not known to be disabled.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.valid && self.enabled != Some(false)
    }
}

/// A manifest that was skipped because it could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    /// Plugin the manifest belongs to
    pub plugin: PluginReference,
    /// Manifest path
    pub file: String,
    /// What went wrong
    pub message: String,
}

/// Output of one resolver run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    /// Scope that was checked
    #[serde(default)]
    pub checked_scope: ScopeKind,
    /// Single-plugin filter, if any
    #[serde(default)]
    pub checked_plugin: Option<String>,
    /// Single-marketplace filter, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_marketplace: Option<String>,
    /// Required plugin dependencies
    #[serde(default)]
    pub dependencies: Vec<CheckResult>,
    /// Optional plugin dependencies
    #[serde(default)]
    pub optional_dependencies: Vec<CheckResult>,
    /// Required system dependencies
    #[serde(default)]
    pub system_dependencies: Vec<CheckResult>,
    /// Optional system dependencies
    #[serde(default)]
    pub optional_system_dependencies: Vec<CheckResult>,
    /// Manifests that could not be loaded
    #[serde(default)]
    pub errors: Vec<ReportError>,
}

impl CheckReport {
    /// The results of one section.
    #[must_use]
    pub fn section(&self, section: Section) -> &[CheckResult] {
        match section {
            Section::Dependencies => &self.dependencies,
            Section::OptionalDependencies => &self.optional_dependencies,
            Section::SystemDependencies => &self.system_dependencies,
            Section::OptionalSystemDependencies => &self.optional_system_dependencies,
        }
    }

    /// Mutable access to one section.
    pub fn section_mut(&mut self, section: Section) -> &mut Vec<CheckResult> {
        match section {
            Section::Dependencies => &mut self.dependencies,
            Section::OptionalDependencies => &mut self.optional_dependencies,
            Section::SystemDependencies => &mut self.system_dependencies,
            Section::OptionalSystemDependencies => &mut self.optional_system_dependencies,
        }
    }

    /// Every result, sections in reporting order.
    pub fn results(&self) -> impl Iterator<Item = (Section, &CheckResult)> {
        Section::ALL
            .into_iter()
            .flat_map(move |section| self.section(section).iter().map(move |r| (section, r)))
    }

    /// Every result, mutably.
    pub fn results_mut(&mut self) -> impl Iterator<Item = &mut CheckResult> {
        self.dependencies
            .iter_mut()
            .chain(self.optional_dependencies.iter_mut())
            .chain(self.system_dependencies.iter_mut())
            .chain(self.optional_system_dependencies.iter_mut())
    }

    /// Whether the run passes: every required dependency is valid and no
    /// manifest was skipped. Optional sections never affect it.
    #[must_use]
    pub fn passes(&self) -> bool {
        self.errors.is_empty()
            && self.dependencies.iter().all(|r| r.valid)
            && self.system_dependencies.iter().all(|r| r.valid)
    }
}
