//! Version parsing for plugin and system dependencies.
//!
//! Versions in the wild are messier than strict semver: plugin registries
//! record `v1.2`, command-line tools print `gh version 2.40.1 (2023-12-13)`,
//! and plugins installed from a git checkout carry a 12-character commit SHA
//! instead of a version. This module normalizes the first two into
//! [`semver::Version`] and rejects the third.
//!
//! # Module Organization
//!
//! - [`constraints`] - The constraint grammar (`^`, `~`, comparisons, AND, `||`)
//! - [`parse_version`] - Lenient version parsing
//! - [`extract_version`] - Pull the first version-shaped token out of tool output
//!
//! # Examples
//!
//! ```rust,no_run
//! use plugdeps_cli::version::{extract_version, parse_version};
//!
//! let version = parse_version("v1.2")?;
//! assert_eq!(version.to_string(), "1.2.0");
//!
//! let found = extract_version("gh version 2.40.1 (2023-12-13)");
//! assert_eq!(found.as_deref(), Some("2.40.1"));
//! # Ok::<(), plugdeps_cli::core::PlugdepsError>(())
//! ```

pub mod constraints;

pub use constraints::{VersionConstraint, evaluate};

use crate::core::PlugdepsError;
use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};
use std::sync::OnceLock;

/// Length of the abbreviated commit SHA recorded for git-installed plugins.
const GIT_SHA_LENGTH: usize = 12;

/// Parse a version string leniently.
///
/// Accepts a leading `v`/`V`, and missing minor or patch components default
/// to `0` (`"1.2"` parses as `1.2.0`). Pre-release and build metadata are
/// preserved. A 12-character lowercase hex string is a git commit SHA and is
/// rejected even when it happens to be all digits.
///
/// # Errors
///
/// Returns [`PlugdepsError::VersionParseError`] when the input is empty, is a
/// commit SHA, or is not version-shaped.
pub fn parse_version(input: &str) -> Result<Version, PlugdepsError> {
    let trimmed = input.trim();
    let parse_error = |reason: &str| PlugdepsError::VersionParseError {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(parse_error("empty version"));
    }

    if is_commit_sha(trimmed) {
        return Err(parse_error("looks like a git commit SHA, not a version"));
    }

    let cleaned = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);

    let (without_build, build) = match cleaned.split_once('+') {
        Some((head, build)) => (head, Some(build)),
        None => (cleaned, None),
    };
    let (core, pre) = match without_build.split_once('-') {
        Some((head, pre)) => (head, Some(pre)),
        None => (without_build, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return Err(parse_error("expected at most three numeric components"));
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(parse_error("version components must be numeric"));
        }
        *slot = part.parse().map_err(|_| parse_error("version component out of range"))?;
    }

    let mut version = Version::new(numbers[0], numbers[1], numbers[2]);
    if let Some(pre) = pre {
        version.pre = Prerelease::new(pre).map_err(|e| parse_error(&e.to_string()))?;
    }
    if let Some(build) = build {
        version.build = BuildMetadata::new(build).map_err(|e| parse_error(&e.to_string()))?;
    }

    Ok(version)
}

/// Returns true for the abbreviated commit SHAs that stand in for a version.
fn is_commit_sha(input: &str) -> bool {
    input.len() == GIT_SHA_LENGTH && input.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

fn version_token_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)(?:version\s*)?v?(\d+\.\d+(?:\.\d+)?(?:-[a-zA-Z0-9.-]+)?)").ok()
        })
        .as_ref()
}

/// Extract the first version-shaped token from a tool's version output.
///
/// The token is `MAJOR.MINOR[.PATCH][-PRE]`, optionally preceded by `v` or
/// the word `version`. Returns the bare token without the prefix.
#[must_use]
pub fn extract_version(output: &str) -> Option<String> {
    version_token_regex()?
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
