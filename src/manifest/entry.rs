//! Raw manifest entry values.
//!
//! A manifest value is either a bare constraint string or an object with a
//! `version` key and an optional `help` key. Serde's `untagged` attribute
//! picks the variant from the JSON shape; [`RawEntry::into_parts`] then
//! collapses both forms into the same `(constraint, help)` pair so nothing
//! downstream needs to know which form was written.

use serde::Deserialize;

/// A manifest value as written on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    /// `"gh": ">=2.0.0"`
    Constraint(String),

    /// `"gh": { "version": ">=2.0.0", "help": "brew install gh" }`
    Detailed(DetailedEntry),
}

/// Object form of a manifest value.
///
/// `version` is optional here so a missing key can be reported with the
/// entry's name instead of a generic serde message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetailedEntry {
    /// Version constraint
    #[serde(default)]
    pub version: Option<String>,

    /// Human-readable installation hint
    #[serde(default)]
    pub help: Option<String>,
}

impl RawEntry {
    /// Normalize to `(constraint, help)`.
    ///
    /// Returns `None` when the object form omits `version`.
    pub fn into_parts(self) -> Option<(String, Option<String>)> {
        match self {
            Self::Constraint(constraint) => Some((constraint, None)),
            Self::Detailed(DetailedEntry {
                version,
                help,
            }) => version.map(|constraint| (constraint, help)),
        }
    }
}
