//! Plugin dependency manifests (`extends-plugin.json`).
//!
//! A plugin declares what it needs from its environment in
//! `.claude-plugin/extends-plugin.json` inside its install directory:
//!
//! ```json
//! {
//!   "dependencies": {
//!     "bug-fixes@aaronbassett-marketplace": "^0.3.0"
//!   },
//!   "optionalDependencies": {
//!     "linter": { "version": ">=1.0.0", "help": "Adds lint checks to reviews" }
//!   },
//!   "systemDependencies": {
//!     "gh": { "version": ">=2.0.0", "help": "https://cli.github.com" }
//!   },
//!   "optionalSystemDependencies": {}
//! }
//! ```
//!
//! All four sections are optional and unknown top-level keys are ignored.
//! Entries keep their declaration order, which is the order results are
//! reported in.
//!
//! # Loading Rules
//!
//! - A missing file is [`PlugdepsError::ManifestNotFound`]; callers treat it
//!   as a plugin with no dependencies
//! - Malformed JSON, a section that is not an object, an entry that is
//!   neither a string nor an object, or an object without `version` is
//!   [`PlugdepsError::ManifestParseError`] naming the offending key
//! - Constraints are kept as written; they are evaluated (and may fail to
//!   parse) per dependency by the resolver
//!
//! Manifests are read fresh on every invocation and never written.

mod entry;

pub use entry::{DetailedEntry, RawEntry};

use crate::core::PlugdepsError;
use crate::models::PluginReference;
use serde_json::{Map, Value};
use std::path::Path;

/// Directory inside a plugin that holds its metadata files.
pub const PLUGIN_METADATA_DIR: &str = ".claude-plugin";

/// File name of the dependency manifest inside [`PLUGIN_METADATA_DIR`].
pub const MANIFEST_FILE_NAME: &str = "extends-plugin.json";

/// The four manifest sections, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Required plugin dependencies
    Dependencies,
    /// Optional plugin dependencies
    OptionalDependencies,
    /// Required system executables
    SystemDependencies,
    /// Optional system executables
    OptionalSystemDependencies,
}

impl Section {
    /// All sections in the fixed reporting order.
    pub const ALL: [Self; 4] = [
        Self::Dependencies,
        Self::OptionalDependencies,
        Self::SystemDependencies,
        Self::OptionalSystemDependencies,
    ];

    /// The JSON key of this section.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::OptionalDependencies => "optionalDependencies",
            Self::SystemDependencies => "systemDependencies",
            Self::OptionalSystemDependencies => "optionalSystemDependencies",
        }
    }

    /// Whether failures in this section leave the exit status alone.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::OptionalDependencies | Self::OptionalSystemDependencies)
    }

    /// Whether this section lists executables rather than plugins.
    #[must_use]
    pub const fn is_system(self) -> bool {
        matches!(self, Self::SystemDependencies | Self::OptionalSystemDependencies)
    }
}

/// A declared dependency on another plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    /// The plugin depended on
    pub reference: PluginReference,
    /// Version constraint as written
    pub constraint: String,
    /// Installation hint from the manifest
    pub help: Option<String>,
    /// Declared in `optionalDependencies`
    pub optional: bool,
}

/// A declared dependency on an executable found on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDependencySpec {
    /// Executable name
    pub command: String,
    /// Version constraint as written
    pub constraint: String,
    /// Installation hint from the manifest
    pub help: Option<String>,
    /// Declared in `optionalSystemDependencies`
    pub optional: bool,
}

/// A parsed dependency manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDoc {
    /// Required plugin dependencies
    pub dependencies: Vec<DependencySpec>,
    /// Optional plugin dependencies
    pub optional_dependencies: Vec<DependencySpec>,
    /// Required system executables
    pub system_dependencies: Vec<SystemDependencySpec>,
    /// Optional system executables
    pub optional_system_dependencies: Vec<SystemDependencySpec>,
}

impl ManifestDoc {
    /// Load a manifest from disk.
    ///
    /// # Errors
    ///
    /// - [`PlugdepsError::ManifestNotFound`] when `path` does not exist
    /// - [`PlugdepsError::ManifestParseError`] when it cannot be interpreted
    /// - [`PlugdepsError::IoError`] when it exists but cannot be read
    pub fn load(path: &Path) -> Result<Self, PlugdepsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlugdepsError::ManifestNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        Self::parse(&content, &path.display().to_string())
    }

    /// Parse manifest JSON. `origin` names the document in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`PlugdepsError::ManifestParseError`] for malformed documents.
    pub fn parse(content: &str, origin: &str) -> Result<Self, PlugdepsError> {
        let parse_error = |reason: String| PlugdepsError::ManifestParseError {
            file: origin.to_string(),
            reason,
        };

        let root: Value =
            serde_json::from_str(content).map_err(|e| parse_error(format!("invalid JSON: {e}")))?;
        let Value::Object(root) = root else {
            return Err(parse_error("top level must be a JSON object".to_string()));
        };

        let mut doc = Self::default();
        for section in Section::ALL {
            let entries = section_entries(&root, section).map_err(parse_error)?;

            if section.is_system() {
                let specs = entries.into_iter().map(|(command, constraint, help)| {
                    SystemDependencySpec {
                        command,
                        constraint,
                        help,
                        optional: section.is_optional(),
                    }
                });
                if section.is_optional() {
                    doc.optional_system_dependencies.extend(specs);
                } else {
                    doc.system_dependencies.extend(specs);
                }
            } else {
                let mut specs = Vec::with_capacity(entries.len());
                for (key, constraint, help) in entries {
                    let reference = PluginReference::parse(&key).map_err(|_| {
                        parse_error(format!(
                            "{}: '{key}' is not a valid plugin reference",
                            section.key()
                        ))
                    })?;
                    specs.push(DependencySpec {
                        reference,
                        constraint,
                        help,
                        optional: section.is_optional(),
                    });
                }
                if section.is_optional() {
                    doc.optional_dependencies.extend(specs);
                } else {
                    doc.dependencies.extend(specs);
                }
            }
        }

        Ok(doc)
    }

    /// Whether the manifest declares nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
            && self.optional_dependencies.is_empty()
            && self.system_dependencies.is_empty()
            && self.optional_system_dependencies.is_empty()
    }

    /// Total number of declared dependencies across all sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
            + self.optional_dependencies.len()
            + self.system_dependencies.len()
            + self.optional_system_dependencies.len()
    }
}

/// Path of the manifest for a plugin installed at `plugin_dir`.
#[must_use]
pub fn manifest_path(plugin_dir: &Path) -> std::path::PathBuf {
    plugin_dir.join(PLUGIN_METADATA_DIR).join(MANIFEST_FILE_NAME)
}

/// Read one section as `(key, constraint, help)` triples in declaration order.
fn section_entries(
    root: &Map<String, Value>,
    section: Section,
) -> Result<Vec<(String, String, Option<String>)>, String> {
    let entries = match root.get(section.key()) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(entries)) => entries,
        Some(_) => return Err(format!("'{}' must be an object", section.key())),
    };

    let mut parsed = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if !(value.is_string() || value.is_object()) {
            return Err(format!(
                "{}: entry '{key}' must be a version string or an object with a \"version\" key",
                section.key()
            ));
        }

        let raw: RawEntry = serde_json::from_value(value.clone())
            .map_err(|e| format!("{}: entry '{key}': {e}", section.key()))?;
        let (constraint, help) = raw.into_parts().ok_or_else(|| {
            format!("{}: entry '{key}' is missing required key \"version\"", section.key())
        })?;
        parsed.push((key.clone(), constraint, help));
    }

    Ok(parsed)
}
