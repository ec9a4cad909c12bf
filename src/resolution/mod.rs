//! Mapping verdicts to remediation actions.
//!
//! [`map_to_action`] turns one [`CheckResult`] into exactly one
//! [`ResolutionAction`]. It is pure and total: every combination of
//! installed, enabled, valid, marketplace-known and availability maps to
//! some action, and the same result always maps to the same action.
//!
//! # Rules
//!
//! A satisfied result (valid, and not known to be disabled) needs nothing.
//! Otherwise the first matching rule wins:
//!
//! | # | Condition | Action |
//! |---|-----------|--------|
//! | 1 | referenced marketplace unknown | [`ResolutionAction::AddMarketplace`] |
//! | 2 | reference matches several plugins | [`ResolutionAction::Disambiguate`] |
//! | 3 | not installed, availability unknown | [`ResolutionAction::CheckRemoteManually`] |
//! | 4 | not installed | [`ResolutionAction::Install`] |
//! | 5 | installed, not enabled | [`ResolutionAction::Enable`] |
//! | 6 | installed, enabled, a satisfying version available | [`ResolutionAction::Update`] |
//! | 7 | installed, enabled, nothing known to be available | [`ResolutionAction::CheckRemoteManually`] |
//! | 8 | system command missing | [`ResolutionAction::InstallSystemDependency`] |
//! | 9 | system command present, version invalid | [`ResolutionAction::UpdateSystemDependency`] |
//!
//! A missing marketplace always outranks a version problem: installing or
//! updating from a marketplace the host does not know cannot succeed.

mod steps;

pub use steps::{ResolutionStep, StepKind, format_steps, steps_for_report};

use crate::resolver::{Availability, CheckResult, Issue, Subject};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single recommended remediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResolutionAction {
    /// Register a marketplace with the host
    AddMarketplace {
        /// Marketplace name
        marketplace: String,
    },
    /// Install a plugin
    Install {
        /// Plugin name
        name: String,
        /// Marketplace to install from, when known
        marketplace: Option<String>,
    },
    /// Enable an installed plugin
    Enable {
        /// Plugin name
        name: String,
        /// Marketplace it was installed from
        marketplace: Option<String>,
    },
    /// Update an installed plugin
    Update {
        /// Plugin name
        name: String,
        /// Marketplace offering the update
        marketplace: String,
    },
    /// No catalog could confirm a fix; look upstream by hand
    CheckRemoteManually {
        /// Plugin name
        name: String,
    },
    /// Qualify an ambiguous reference with a marketplace
    Disambiguate {
        /// Plugin name
        name: String,
        /// Fully-qualified candidates
        candidates: Vec<String>,
    },
    /// Install a system command
    InstallSystemDependency {
        /// Command name
        command: String,
        /// Manifest help text
        help: Option<String>,
    },
    /// Upgrade (or downgrade) a system command
    UpdateSystemDependency {
        /// Command name
        command: String,
        /// Manifest help text
        help: Option<String>,
    },
    /// Nothing to do
    None,
}

impl ResolutionAction {
    /// Whether this action asks the user to do something.
    #[must_use]
    pub const fn is_needed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddMarketplace {
                marketplace,
            } => write!(f, "/plugin marketplace add {marketplace}"),
            Self::Install {
                name,
                marketplace: Some(marketplace),
            } => write!(f, "/plugin install {name}@{marketplace}"),
            Self::Install {
                name,
                marketplace: None,
            } => write!(f, "/plugin install {name}"),
            Self::Enable {
                ..
            } => write!(f, "Enable via /plugin TUI"),
            Self::Update {
                name,
                marketplace,
            } => write!(f, "/plugin update {name}@{marketplace}"),
            Self::CheckRemoteManually {
                name,
            } => write!(f, "Check the marketplace for a version of {name} that satisfies the requirement"),
            Self::Disambiguate {
                name,
                candidates,
            } => write!(f, "Qualify {name} as one of: {}", candidates.join(", ")),
            Self::InstallSystemDependency {
                command,
                ..
            } => write!(f, "Install {command}"),
            Self::UpdateSystemDependency {
                command,
                ..
            } => write!(f, "Update {command}"),
            Self::None => write!(f, "No action needed"),
        }
    }
}

/// Map a verdict to its remediation.
#[must_use]
pub fn map_to_action(result: &CheckResult) -> ResolutionAction {
    if result.is_satisfied() {
        return ResolutionAction::None;
    }

    match &result.subject {
        Subject::System {
            command,
        } => {
            let help = (!result.help.is_empty()).then(|| result.help.clone());
            if result.installed {
                ResolutionAction::UpdateSystemDependency {
                    command: command.clone(),
                    help,
                }
            } else {
                ResolutionAction::InstallSystemDependency {
                    command: command.clone(),
                    help,
                }
            }
        }
        Subject::Plugin {
            plugin,
            marketplace,
        } => map_plugin(result, plugin, marketplace.as_deref()),
    }
}

fn map_plugin(result: &CheckResult, name: &str, marketplace: Option<&str>) -> ResolutionAction {
    if let Some(marketplace) = marketplace
        && !result.marketplace_known
    {
        return ResolutionAction::AddMarketplace {
            marketplace: marketplace.to_string(),
        };
    }

    if let Some(Issue::AmbiguousReference {
        candidates,
    }) = &result.issue
    {
        return ResolutionAction::Disambiguate {
            name: name.to_string(),
            candidates: candidates.clone(),
        };
    }

    if !result.installed {
        return match &result.availability {
            Availability::Available {
                marketplace: source,
                ..
            } => ResolutionAction::Install {
                name: name.to_string(),
                marketplace: Some(source.clone()),
            },
            Availability::Ambiguous {
                marketplaces,
            } => ResolutionAction::Disambiguate {
                name: name.to_string(),
                candidates: marketplaces.iter().map(|m| format!("{name}@{m}")).collect(),
            },
            Availability::Unknown {
                ..
            } => ResolutionAction::CheckRemoteManually {
                name: name.to_string(),
            },
            Availability::NotChecked | Availability::Unavailable => ResolutionAction::Install {
                name: name.to_string(),
                marketplace: marketplace.map(str::to_string),
            },
        };
    }

    if result.enabled == Some(false) {
        return ResolutionAction::Enable {
            name: name.to_string(),
            marketplace: marketplace.map(str::to_string),
        };
    }

    match &result.availability {
        Availability::Available {
            marketplace: source,
            ..
        } => ResolutionAction::Update {
            name: name.to_string(),
            marketplace: source.clone(),
        },
        _ => ResolutionAction::CheckRemoteManually {
            name: name.to_string(),
        },
    }
}

#[cfg(test)]
mod tests;
