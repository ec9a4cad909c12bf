//! Dependency resolution: checking declared dependencies against the installation.
//!
//! The resolver takes a [`ScopeSelector`] and an [`InstallationState`]
//! snapshot and produces one [`CheckResult`] per declared dependency of every
//! plugin in scope.
//!
//! # Two-Phase Evaluation
//!
//! ## Phase 1: Local Pass
//! - Select the plugins in scope and load their manifests in parallel
//! - Probe every distinct system command once, in parallel
//! - Evaluate each plugin dependency against the installed records:
//!   - no record: not installed
//!   - one record: installed; the constraint is evaluated against its version
//!   - several records: the reference is ambiguous and reported as such,
//!     never silently resolved to one of them
//!
//! ## Phase 2: Availability Pass
//! - Only plugin results that are still invalid, and whose marketplace is
//!   known, take part
//! - The catalogs they need are fetched once per marketplace, in parallel
//! - Each result's availability is derived from the fetched catalogs; a
//!   failed fetch degrades to [`Availability::Unknown`]
//!
//! Satisfied dependencies never cause a network request.
//!
//! # Ordering
//!
//! Sections are reported in the fixed order `dependencies`,
//! `optionalDependencies`, `systemDependencies`,
//! `optionalSystemDependencies`. Within a section, results follow the
//! plugins in scope order and, per plugin, manifest declaration order. Given
//! an unchanged installation the serialized report is byte-identical across
//! runs.
//!
//! # Error Containment
//!
//! A manifest that cannot be parsed is recorded in [`CheckReport::errors`]
//! and skipped; every other manifest is still checked. A missing manifest
//! means the plugin declares no dependencies. Version syntax errors make the
//! affected result invalid with [`Issue::VersionParse`].

pub mod check_result;
pub mod scope;

pub use check_result::{Availability, CheckReport, CheckResult, Issue, ReportError, Subject};
pub use scope::{ScopedPlugin, select_plugins};

use crate::core::PlugdepsError;
use crate::manifest::{DependencySpec, ManifestDoc, Section, SystemDependencySpec, manifest_path};
use crate::models::{PluginReference, ScopeFilter, ScopeSelector};
use crate::probe::{ProbeResult, Prober};
use crate::state::{AvailableLookup, CatalogFetcher, InstallationState, MarketplaceRegistry};
use crate::version::{VersionConstraint, parse_version};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// A phase 1 result that phase 2 revisits.
struct Pending {
    section: Section,
    index: usize,
    lookup: PluginReference,
}

/// Checks declared dependencies of the plugins in scope.
///
/// Generic over the [`Prober`] used for system commands and the
/// [`CatalogFetcher`] used for availability, so tests can substitute both.
pub struct DependencyResolver<P, F> {
    prober: P,
    fetcher: F,
}

impl<P: Prober, F: CatalogFetcher> DependencyResolver<P, F> {
    /// Create a resolver.
    pub const fn new(prober: P, fetcher: F) -> Self {
        Self {
            prober,
            fetcher,
        }
    }

    /// Check every dependency declared by the plugins `selector` admits.
    ///
    /// `state` is consumed because fetched catalogs are attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`PlugdepsError::PluginNotFound`] when a plugin filter names
    /// a plugin that does not exist. Everything else is contained in the
    /// report.
    pub async fn resolve(
        &self,
        selector: &ScopeSelector,
        mut state: InstallationState,
    ) -> Result<CheckReport, PlugdepsError> {
        let plugins = select_plugins(selector, &state).await?;

        let mut report = CheckReport {
            checked_scope: selector.kind,
            checked_plugin: match &selector.filter {
                ScopeFilter::Plugin(reference) => Some(reference.to_string()),
                _ => None,
            },
            checked_marketplace: match &selector.filter {
                ScopeFilter::Marketplace(name) => Some(name.clone()),
                _ => None,
            },
            ..CheckReport::default()
        };

        let manifests = load_manifests(&plugins, &mut report.errors).await;
        let probes = self.probe_commands(&manifests).await;

        let mut pending = Vec::new();
        for (dependent, doc) in &manifests {
            for (section, specs) in [
                (Section::Dependencies, &doc.dependencies),
                (Section::OptionalDependencies, &doc.optional_dependencies),
            ] {
                for spec in specs {
                    let (result, lookup) = check_plugin(dependent, spec, &state);
                    let results = report.section_mut(section);
                    if let Some(lookup) = lookup {
                        pending.push(Pending {
                            section,
                            index: results.len(),
                            lookup,
                        });
                    }
                    results.push(result);
                }
            }

            for (section, specs) in [
                (Section::SystemDependencies, &doc.system_dependencies),
                (Section::OptionalSystemDependencies, &doc.optional_system_dependencies),
            ] {
                for spec in specs {
                    let probe = probes.get(&spec.command).cloned().unwrap_or_default();
                    report.section_mut(section).push(check_system(dependent, spec, &probe));
                }
            }
        }

        if !pending.is_empty() {
            self.attach_catalogs(&pending, &mut state).await;
            for item in &pending {
                let lookup = state.find_available(&item.lookup);
                if let Some(result) = report.section_mut(item.section).get_mut(item.index) {
                    result.availability = availability(result, lookup);
                }
            }
        }

        debug!(
            target: "resolver",
            "checked {} manifest(s): {} result(s), {} revisited for availability, {} error(s)",
            manifests.len(),
            report.results().count(),
            pending.len(),
            report.errors.len()
        );

        Ok(report)
    }

    async fn probe_commands(
        &self,
        manifests: &[(PluginReference, ManifestDoc)],
    ) -> BTreeMap<String, ProbeResult> {
        let commands: BTreeSet<&str> = manifests
            .iter()
            .flat_map(|(_, doc)| {
                doc.system_dependencies.iter().chain(&doc.optional_system_dependencies)
            })
            .map(|spec| spec.command.as_str())
            .collect();

        let probes = commands.into_iter().map(|command| async move {
            (command.to_string(), self.prober.probe(command).await)
        });
        join_all(probes).await.into_iter().collect()
    }

    /// Fetch every catalog a pending result needs that is not attached yet.
    async fn attach_catalogs(&self, pending: &[Pending], state: &mut InstallationState) {
        let wanted: BTreeSet<String> = pending
            .iter()
            .flat_map(|item| match &item.lookup.marketplace {
                Some(marketplace) => vec![marketplace.clone()],
                None => state.marketplaces().map(|m| m.name.clone()).collect(),
            })
            .filter(|name| !state.has_catalog(name))
            .collect();

        let registries: Vec<MarketplaceRegistry> =
            wanted.iter().filter_map(|name| state.marketplace(name).cloned()).collect();
        if registries.is_empty() {
            return;
        }

        debug!(target: "resolver", "fetching {} catalog(s) for availability", registries.len());
        let fetched = join_all(registries.iter().map(|registry| self.fetcher.fetch(registry))).await;

        for (registry, result) in registries.iter().zip(fetched) {
            if let Err(e) = &result {
                warn!(target: "resolver", "{e}; availability from '{}' is unknown", registry.name);
            }
            state.insert_catalog(&registry.name, result);
        }
    }
}

/// Load the manifests of `plugins` in parallel, keeping scope order.
///
/// Plugins without a manifest are dropped; unreadable manifests are
/// recorded in `errors` and dropped.
async fn load_manifests(
    plugins: &[ScopedPlugin],
    errors: &mut Vec<ReportError>,
) -> Vec<(PluginReference, ManifestDoc)> {
    let loads = plugins.iter().map(|plugin| {
        let path = plugin.dir.as_deref().map(manifest_path);
        async move {
            let path = path?;
            let blocking_path = path.clone();
            let result = tokio::task::spawn_blocking(move || ManifestDoc::load(&blocking_path))
                .await
                .unwrap_or_else(|e| {
                    Err(PlugdepsError::Other {
                        message: format!("manifest loader failed: {e}"),
                    })
                });
            Some((path, result))
        }
    });

    let mut manifests = Vec::new();
    for (plugin, loaded) in plugins.iter().zip(join_all(loads).await) {
        match loaded {
            None => {}
            Some((_, Ok(doc))) => {
                debug!(target: "resolver", "'{}' declares {} dependency(ies)", plugin.reference, doc.len());
                manifests.push((plugin.reference.clone(), doc));
            }
            Some((path, Err(PlugdepsError::ManifestNotFound { .. }))) => {
                debug!(target: "resolver", "'{}' has no manifest at {}", plugin.reference, path.display());
            }
            Some((path, Err(e))) => {
                warn!(target: "resolver", "skipping manifest of '{}': {e}", plugin.reference);
                errors.push(ReportError {
                    plugin: plugin.reference.clone(),
                    file: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
    manifests
}

/// Evaluate a constraint against a (possibly unknown) version.
fn verdict(version: Option<&str>, constraint: &str) -> (bool, Option<Issue>) {
    let constraint = match VersionConstraint::parse(constraint) {
        Ok(constraint) => constraint,
        Err(e) => {
            return (
                false,
                Some(Issue::VersionParse {
                    message: e.to_string(),
                }),
            );
        }
    };

    let Some(version) = version else {
        return (false, Some(Issue::UnknownVersion));
    };

    match parse_version(version) {
        Ok(parsed) => {
            let matched = constraint.matches(&parsed);
            tracing::trace!(target: "resolver", "{version} against '{constraint}': {matched}");
            (matched, None)
        }
        Err(e) => (
            false,
            Some(Issue::VersionParse {
                message: e.to_string(),
            }),
        ),
    }
}

/// Phase 1 for a plugin dependency. Also returns the reference to look up
/// in catalogs when the result needs phase 2.
fn check_plugin(
    dependent: &PluginReference,
    spec: &DependencySpec,
    state: &InstallationState,
) -> (CheckResult, Option<PluginReference>) {
    let reference = &spec.reference;
    let marketplace_known =
        reference.marketplace.as_deref().is_none_or(|m| state.is_marketplace_known(m));

    let mut result = CheckResult {
        subject: Subject::plugin(reference),
        dependent: dependent.clone(),
        required_version: spec.constraint.clone(),
        installed: false,
        enabled: None,
        installed_version: None,
        valid: false,
        help: String::new(),
        marketplace_known,
        optional: spec.optional,
        availability: Availability::NotChecked,
        issue: None,
        action: None,
    };

    let lookup = match state.find_installed(reference).as_slice() {
        [] => Some(reference.clone()),
        [record] => {
            let (valid, issue) = verdict(record.version.as_deref(), &spec.constraint);
            result.installed = true;
            result.enabled = Some(record.enabled);
            result.installed_version = record.version.clone();
            result.valid = valid;
            result.issue = issue;
            (!valid).then(|| record.reference())
        }
        records => {
            let candidates: Vec<String> =
                records.iter().map(|record| record.reference().to_string()).collect();
            let ambiguity = PlugdepsError::AmbiguousPluginReference {
                name: reference.name.clone(),
                candidates: candidates.clone(),
            };
            warn!(target: "resolver", "{ambiguity} (required by {dependent})");
            result.installed = true;
            result.issue = Some(Issue::AmbiguousReference {
                candidates,
            });
            None
        }
    };

    result.help = spec.help.clone().unwrap_or_else(|| plugin_help(&result));
    (result, lookup.filter(|_| marketplace_known))
}

fn plugin_help(result: &CheckResult) -> String {
    let name = result.subject.name();

    if !result.installed {
        return match result.subject.marketplace() {
            Some(marketplace) if !result.marketplace_known => {
                format!("Marketplace {marketplace} is not known; add it before installing {name}")
            }
            Some(marketplace) => format!("Plugin {name} from {marketplace} is not installed"),
            None => format!("Plugin {name} is not installed"),
        };
    }

    match &result.issue {
        Some(Issue::AmbiguousReference {
            candidates,
        }) => {
            format!("Plugin reference {name} is ambiguous; qualify it as one of: {}", candidates.join(", "))
        }
        Some(Issue::VersionParse {
            message,
        }) => format!("Cannot evaluate version: {message}"),
        Some(Issue::UnknownVersion) => format!(
            "Installed version of {name} is unknown; cannot verify {}",
            result.required_version
        ),
        None if !result.valid => mismatch_help(result),
        None if result.enabled == Some(false) => format!("Plugin {name} is installed but not enabled"),
        None => String::new(),
    }
}

fn check_system(
    dependent: &PluginReference,
    spec: &SystemDependencySpec,
    probe: &ProbeResult,
) -> CheckResult {
    let (valid, issue) = if probe.installed {
        verdict(probe.version.as_deref(), &spec.constraint)
    } else {
        (false, None)
    };

    let mut result = CheckResult {
        subject: Subject::System {
            command: spec.command.clone(),
        },
        dependent: dependent.clone(),
        required_version: spec.constraint.clone(),
        installed: probe.installed,
        enabled: None,
        installed_version: probe.version.clone(),
        valid,
        help: String::new(),
        marketplace_known: true,
        optional: spec.optional,
        availability: Availability::NotChecked,
        issue,
        action: None,
    };

    result.help = spec.help.clone().unwrap_or_else(|| system_help(&result));
    result
}

fn system_help(result: &CheckResult) -> String {
    let command = result.subject.name();

    if !result.installed {
        return format!("Command '{command}' is not installed or not in PATH");
    }

    match &result.issue {
        Some(Issue::VersionParse {
            message,
        }) => format!("Cannot evaluate version: {message}"),
        Some(Issue::UnknownVersion) => {
            format!("Command '{command}' is installed but its version could not be determined")
        }
        _ if !result.valid => mismatch_help(result),
        _ => String::new(),
    }
}

fn mismatch_help(result: &CheckResult) -> String {
    format!(
        "Installed version {} does not satisfy required version {}",
        result.installed_version.as_deref().unwrap_or("unknown"),
        result.required_version
    )
}

/// Phase 2: derive availability from the catalogs consulted for `result`.
///
/// For a plugin that is not installed any listing counts; listings in more
/// than one marketplace are ambiguous. For an installed plugin the listing in
/// its own marketplace counts only if it satisfies the constraint.
fn availability(result: &CheckResult, lookup: AvailableLookup) -> Availability {
    let candidates = match lookup {
        AvailableLookup::Unknown(reason) => {
            return Availability::Unknown {
                reason,
            };
        }
        AvailableLookup::Candidates(candidates) => candidates,
    };

    if !result.installed {
        let mut marketplaces: Vec<String> =
            candidates.iter().map(|candidate| candidate.marketplace.clone()).collect();
        marketplaces.dedup();

        return match (marketplaces.len(), candidates.into_iter().next()) {
            (1, Some(candidate)) => Availability::Available {
                marketplace: candidate.marketplace,
                version: candidate.version,
            },
            (0, _) | (_, None) => Availability::Unavailable,
            _ => Availability::Ambiguous {
                marketplaces,
            },
        };
    }

    let Some(candidate) = candidates.into_iter().next() else {
        return Availability::Unavailable;
    };
    let Some(offered) = candidate.version.as_deref() else {
        return Availability::Unknown {
            reason: format!(
                "catalog of {} lists {} without a version",
                candidate.marketplace,
                result.subject.name()
            ),
        };
    };

    if offers_fix(offered, &result.required_version) {
        Availability::Available {
            marketplace: candidate.marketplace,
            version: candidate.version,
        }
    } else {
        Availability::Unavailable
    }
}

/// Whether an offered version satisfies the constraint. An unparseable
/// constraint or version never does.
fn offers_fix(offered: &str, constraint: &str) -> bool {
    let Ok(offered) = parse_version(offered) else {
        return false;
    };
    VersionConstraint::parse(constraint).is_ok_and(|c| c.matches(&offered))
}
