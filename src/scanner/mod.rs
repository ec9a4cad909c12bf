//! Pattern scanner: finding candidate dependency references in plugin files.
//!
//! The scanner reads a plugin's Markdown, JSON, Python and shell files and
//! reports every place that looks like a reference to a skill, an agent, a
//! system command, a tool or another plugin. It deliberately over-matches
//! and never judges whether a reference is real; its output is raw material
//! for writing an `extends-plugin.json`, and the resolver never consumes it.
//!
//! # File Selection
//!
//! - Extensions: `md`, `json`, `py`, `sh`, `bash`
//! - Skipped directories: VCS metadata, dependency folders, virtualenvs,
//!   tool caches and build output (see [`should_skip_dir`])
//! - Symlinks are not followed
//!
//! Files are scanned in parallel on the blocking pool; results are returned
//! in path order.

pub mod patterns;

pub use patterns::{MatchCategory, Pattern, patterns};

use crate::core::PlugdepsError;
use crate::manifest::PLUGIN_METADATA_DIR;
use crate::models::PluginReference;
use crate::state::InstallationState;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Characters of context kept on each side of a match.
pub const CONTEXT_CHARS: usize = 30;

/// Extensions of files worth scanning.
pub const SCANNED_EXTENSIONS: &[&str] = &["md", "json", "py", "sh", "bash"];

const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "dist",
    "build",
    ".eggs",
];

/// Marketplace name reported for directories scanned by path.
pub const LOCAL_MARKETPLACE: &str = "local";

/// Whether a directory is never descended into.
#[must_use]
pub fn should_skip_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name) || name.ends_with(".egg-info")
}

/// One candidate reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    /// Plugin the file belongs to
    pub scanned_plugin: String,
    /// Marketplace of that plugin
    pub scanned_marketplace: String,
    /// `file:line:column`, 1-based
    pub location: String,
    /// Matched text, trimmed
    pub matched: String,
    /// Surrounding text, whitespace-collapsed
    pub context: String,
    /// What the match looks like
    #[serde(rename = "type")]
    pub category: MatchCategory,
}

/// A plugin directory to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Plugin name
    pub plugin: String,
    /// Marketplace name
    pub marketplace: String,
    /// Plugin root
    pub dir: PathBuf,
}

/// What to scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanSelection {
    /// Every enabled installed plugin
    #[default]
    Enabled,
    /// One installed plugin
    Plugin(PluginReference),
    /// Every plugin in a known marketplace's checkout
    Marketplace(String),
    /// A plugin directory on disk
    PluginDir(PathBuf),
    /// A marketplace directory on disk
    MarketplaceDir(PathBuf),
}

/// Turn a selection into concrete plugin directories.
///
/// # Errors
///
/// - [`PlugdepsError::PluginNotFound`] for an unknown `--plugin`
/// - [`PlugdepsError::IoError`] when a directory given by path does not exist
pub fn scan_targets(
    selection: &ScanSelection,
    state: &InstallationState,
) -> Result<Vec<ScanTarget>, PlugdepsError> {
    match selection {
        ScanSelection::Enabled => Ok(state
            .installed()
            .filter(|record| record.enabled)
            .filter_map(|record| {
                Some(ScanTarget {
                    plugin: record.name.clone(),
                    marketplace: record.marketplace.clone(),
                    dir: record.install_path.clone()?,
                })
            })
            .collect()),
        ScanSelection::Plugin(reference) => {
            let found = state.find_installed(reference);
            let Some(record) = found.first() else {
                return Err(PlugdepsError::PluginNotFound {
                    name: reference.to_string(),
                    suggestion: state.suggest_installed(&reference.to_string()),
                });
            };
            if found.len() > 1 {
                warn!(target: "scanner", "'{reference}' matches {} installed plugins, scanning {}", found.len(), record.reference());
            }
            Ok(record
                .install_path
                .clone()
                .map(|dir| ScanTarget {
                    plugin: record.name.clone(),
                    marketplace: record.marketplace.clone(),
                    dir,
                })
                .into_iter()
                .collect())
        }
        ScanSelection::Marketplace(name) => {
            let Some(location) = state.marketplace(name).and_then(|m| m.location.clone()) else {
                warn!(target: "scanner", "marketplace '{name}' is not known or has no local checkout");
                return Ok(Vec::new());
            };
            Ok(marketplace_plugins(&location, name))
        }
        ScanSelection::PluginDir(dir) => {
            let dir = std::fs::canonicalize(dir)?;
            Ok(vec![ScanTarget {
                plugin: dir_name(&dir),
                marketplace: LOCAL_MARKETPLACE.to_string(),
                dir,
            }])
        }
        ScanSelection::MarketplaceDir(dir) => {
            let dir = std::fs::canonicalize(dir)?;
            let name = dir_name(&dir);
            Ok(marketplace_plugins(&dir, &name))
        }
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Plugins of a marketplace checkout: each `plugins/*` directory carrying
/// plugin metadata, or the root itself for single-plugin marketplaces.
fn marketplace_plugins(location: &Path, marketplace: &str) -> Vec<ScanTarget> {
    let plugins_dir = location.join("plugins");
    if !plugins_dir.is_dir() {
        if location.join(PLUGIN_METADATA_DIR).exists() {
            return vec![ScanTarget {
                plugin: dir_name(location),
                marketplace: marketplace.to_string(),
                dir: location.to_path_buf(),
            }];
        }
        warn!(target: "scanner", "no plugins directory found in {}", location.display());
        return Vec::new();
    }

    let mut targets: Vec<ScanTarget> = std::fs::read_dir(&plugins_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.join(PLUGIN_METADATA_DIR).exists())
                .map(|dir| ScanTarget {
                    plugin: dir_name(&dir),
                    marketplace: marketplace.to_string(),
                    dir,
                })
                .collect()
        })
        .unwrap_or_default();
    targets.sort_by(|a, b| a.plugin.cmp(&b.plugin));
    targets
}

/// Files under `root` worth scanning, sorted.
#[must_use]
pub fn files_to_scan(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !should_skip_dir(&entry.file_name().to_string_lossy())
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SCANNED_EXTENSIONS.contains(&ext))
        })
        .collect();
    files.sort();
    files
}

/// Scan file contents. `file` is only used for the reported location.
#[must_use]
pub fn scan_content(content: &str, file: &Path, target: &ScanTarget) -> Vec<RawMatch> {
    let mut seen: HashSet<(usize, usize, MatchCategory)> = HashSet::new();
    let mut matches = Vec::new();

    for pattern in patterns() {
        for (start, end) in pattern.spans(content) {
            let (line, column) = line_column(content, start);
            if !seen.insert((line, column, pattern.category)) {
                continue;
            }

            matches.push(RawMatch {
                scanned_plugin: target.plugin.clone(),
                scanned_marketplace: target.marketplace.clone(),
                location: format!("{}:{line}:{column}", file.display()),
                matched: content[start..end].trim().to_string(),
                context: context(content, start, end),
                category: pattern.category,
            });
        }
    }

    matches
}

/// 1-based line and character column of byte offset `offset`.
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}

/// Up to [`CONTEXT_CHARS`] characters either side of a match, whitespace
/// runs collapsed, with `...` where the file continues.
fn context(content: &str, start: usize, end: usize) -> String {
    let from = content[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map_or(0, |(i, _)| i);
    let to = content[end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map_or(content.len(), |(i, _)| end + i);

    let mut context = content[from..to].split_whitespace().collect::<Vec<_>>().join(" ");
    if from > 0 {
        context.insert_str(0, "...");
    }
    if to < content.len() {
        context.push_str("...");
    }
    context
}

/// Scan every file of one plugin directory.
pub async fn scan_target(target: &ScanTarget) -> Vec<RawMatch> {
    if !target.dir.exists() {
        warn!(target: "scanner", "plugin path does not exist: {}", target.dir.display());
        return Vec::new();
    }

    let root = target.dir.clone();
    let files = tokio::task::spawn_blocking(move || files_to_scan(&root)).await.unwrap_or_default();
    debug!(target: "scanner", "scanning {} file(s) of {}@{}", files.len(), target.plugin, target.marketplace);

    let scans = files.into_iter().map(|file| {
        let target = target.clone();
        tokio::task::spawn_blocking(move || match std::fs::read(&file) {
            Ok(bytes) => scan_content(&String::from_utf8_lossy(&bytes), &file, &target),
            Err(e) => {
                warn!(target: "scanner", "could not read {}: {e}", file.display());
                Vec::new()
            }
        })
    });

    join_all(scans).await.into_iter().filter_map(Result::ok).flatten().collect()
}

/// Scan every target, optionally keeping only one category.
pub async fn scan(targets: &[ScanTarget], category: Option<MatchCategory>) -> Vec<RawMatch> {
    let scanned = join_all(targets.iter().map(scan_target)).await;
    scanned
        .into_iter()
        .flatten()
        .filter(|m| category.is_none_or(|wanted| m.category == wanted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn target(dir: &Path) -> ScanTarget {
        ScanTarget {
            plugin: "demo".to_string(),
            marketplace: LOCAL_MARKETPLACE.to_string(),
            dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_line_column_counts_characters() {
        let content = "first\nsécond @agent";
        let offset = content.find('@').unwrap();
        assert_eq!(line_column(content, offset), (2, 8));
        assert_eq!(line_column(content, 0), (1, 1));
    }

    #[test]
    fn test_context_window() {
        let content = format!("{}needle{}", "a".repeat(40), "b".repeat(40));
        let start = content.find("needle").unwrap();
        let ctx = context(&content, start, start + 6);
        assert_eq!(ctx, format!("...{}needle{}...", "a".repeat(30), "b".repeat(30)));

        let short = "see  the\n\n  needle here";
        let start = short.find("needle").unwrap();
        assert_eq!(context(short, start, start + 6), "see the needle here");
    }

    #[test]
    fn test_scan_content_dedups_by_position_and_category() {
        let content = "Requires the bug-fixes plugin.\n";
        let matches = scan_content(content, Path::new("README.md"), &target(Path::new(".")));

        let mut keys: Vec<(String, MatchCategory)> =
            matches.iter().map(|m| (m.location.clone(), m.category)).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);

        assert!(matches.iter().any(|m| m.category == MatchCategory::PluginReference
            && m.matched == "bug-fixes plugin"));
        assert!(matches.iter().all(|m| m.location.starts_with("README.md:1:")));
    }

    #[test]
    fn test_files_to_scan_skips_noise() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        for path in [
            "README.md",
            "skills/x/SKILL.md",
            "scripts/run.sh",
            "scripts/tool.py",
            "node_modules/pkg/README.md",
            ".git/hooks/pre-commit.sh",
            "pkg.egg-info/PKG-INFO.md",
            "build/out.json",
            "image.png",
        ] {
            let full = root.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, "x").unwrap();
        }

        let files: Vec<String> = files_to_scan(root)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(files, vec!["README.md", "scripts/run.sh", "scripts/tool.py", "skills/x/SKILL.md"]);
    }

    #[tokio::test]
    async fn test_scan_plugin_dir_with_category_filter() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("demo");
        std::fs::create_dir_all(dir.join("scripts")).unwrap();
        std::fs::write(dir.join("scripts/setup.sh"), "#!/usr/bin/env bash\ngh --version\n").unwrap();
        std::fs::write(dir.join("README.md"), "Use the /demo:run skill.\n").unwrap();

        let targets = scan_targets(&ScanSelection::PluginDir(dir), &InstallationState::default()).unwrap();
        assert_eq!(targets[0].plugin, "demo");
        assert_eq!(targets[0].marketplace, "local");

        let system = scan(&targets, Some(MatchCategory::SystemCommand)).await;
        assert!(!system.is_empty());
        assert!(system.iter().all(|m| m.category == MatchCategory::SystemCommand));
        assert!(system.iter().any(|m| m.matched.starts_with("#!/usr/bin/env bash")));
        assert!(system.iter().any(|m| m.matched == "gh --version"));

        let all = scan(&targets, None).await;
        assert!(all.iter().any(|m| m.category == MatchCategory::SkillReference));
    }

    #[test]
    fn test_marketplace_dir_targets() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("acme");
        std::fs::create_dir_all(root.join("plugins/b/.claude-plugin")).unwrap();
        std::fs::create_dir_all(root.join("plugins/a/.claude-plugin")).unwrap();
        std::fs::create_dir_all(root.join("plugins/not-a-plugin")).unwrap();

        let targets =
            scan_targets(&ScanSelection::MarketplaceDir(root), &InstallationState::default()).unwrap();
        let names: Vec<&str> = targets.iter().map(|t| t.plugin.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(targets.iter().all(|t| t.marketplace == "acme"));
    }

    #[test]
    fn test_unknown_plugin_is_an_error() {
        let err = scan_targets(
            &ScanSelection::Plugin(PluginReference::unqualified("ghost")),
            &InstallationState::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PlugdepsError::PluginNotFound { .. }));
    }

    #[test]
    fn test_raw_match_json_keys() {
        let raw = RawMatch {
            scanned_plugin: "demo".to_string(),
            scanned_marketplace: "local".to_string(),
            location: "README.md:1:5".to_string(),
            matched: "gh --version".to_string(),
            context: "run gh --version".to_string(),
            category: MatchCategory::SystemCommand,
        };
        let value = serde_json::to_value(raw).unwrap();
        assert_eq!(value["scannedPlugin"], "demo");
        assert_eq!(value["scannedMarketplace"], "local");
        assert_eq!(value["type"], "systemCommand");
    }
}
