//! Error handling for plugdeps
//!
//! This module provides the error type shared by every layer of the dependency
//! checker, plus user-friendly error reporting for the CLI. The design follows
//! two rules:
//! 1. **Strongly-typed errors** for the failure modes the engine distinguishes
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Containment
//!
//! Most of these errors never reach the user as a failure. The resolver folds
//! per-dependency failures into the report instead of propagating them:
//!
//! | Error | Where it ends up |
//! |-------|------------------|
//! | [`PlugdepsError::ManifestParseError`] | top-level `errors` entry, manifest skipped |
//! | [`PlugdepsError::VersionParseError`] | `issue` on the affected check result |
//! | [`PlugdepsError::AmbiguousPluginReference`] | `issue` on the affected check result |
//! | [`PlugdepsError::FetchError`] | availability degraded to `unknown` |
//! | [`PlugdepsError::ProbeError`] | folded into the probe outcome |
//!
//! Only configuration problems and unreadable input given explicitly on the
//! command line abort a run.
//!
//! # Examples
//!
//! ```rust,no_run
//! use plugdeps_cli::core::{PlugdepsError, user_friendly_error};
//!
//! let error = PlugdepsError::ConfigError {
//!     message: "probe_timeout_secs must be positive".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for plugdeps operations.
///
/// Each variant corresponds to one failure mode the checker can distinguish.
/// Variants carry plain strings rather than source errors so they can be
/// embedded in the JSON report verbatim.
#[derive(Error, Debug)]
pub enum PlugdepsError {
    /// A plugin manifest file does not exist.
    ///
    /// At the resolver level this is not a failure: a plugin without an
    /// `extends-plugin.json` simply declares no dependencies.
    #[error("Manifest file not found: {path}")]
    ManifestNotFound {
        /// Path where the manifest was expected
        path: String,
    },

    /// A manifest file exists but could not be interpreted.
    ///
    /// Raised for malformed JSON and for object-form entries that omit the
    /// required `version` key.
    #[error("Invalid manifest {file}: {reason}")]
    ManifestParseError {
        /// Path to the manifest that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// A version or constraint string is not valid semver syntax.
    #[error("Invalid version or constraint '{input}': {reason}")]
    VersionParseError {
        /// The offending version or constraint string
        input: String,
        /// Why it could not be parsed
        reason: String,
    },

    /// An unqualified plugin reference matched more than one candidate.
    #[error("Plugin reference '{name}' is ambiguous: matches {}", .candidates.join(", "))]
    AmbiguousPluginReference {
        /// The unqualified plugin name
        name: String,
        /// Fully-qualified keys of every matching candidate
        candidates: Vec<String>,
    },

    /// A `name@marketplace` string could not be parsed.
    #[error("Invalid plugin reference '{input}'")]
    InvalidPluginReference {
        /// The string that failed to parse
        input: String,
    },

    /// A plugin named on the command line is not part of the installation.
    #[error("Plugin '{name}' is not installed")]
    PluginNotFound {
        /// The requested plugin key
        name: String,
        /// Closest installed name, if any is similar enough
        suggestion: Option<String>,
    },

    /// A marketplace catalog could not be fetched or parsed.
    #[error("Failed to fetch catalog for marketplace '{marketplace}': {reason}")]
    FetchError {
        /// Marketplace whose catalog was requested
        marketplace: String,
        /// Reason for the failure
        reason: String,
    },

    /// A system command could not be probed.
    #[error("Failed to probe command '{command}': {reason}")]
    ProbeError {
        /// The command being probed
        command: String,
        /// Reason for the failure
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information.
///
/// Displayed by `main` when a command fails. The error is printed in red,
/// details in yellow and the suggestion in green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PlugdepsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: PlugdepsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// Recognizes [`PlugdepsError`] variants, [`std::io::Error`] and
/// [`serde_json::Error`]; anything else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<PlugdepsError>() {
        Ok(plugdeps_error) => return create_error_context(plugdeps_error),
        Err(other) => other,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(PlugdepsError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check the ownership and permissions of your Claude configuration directory")
                .with_details("plugdeps only reads files, but every source file must be readable");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(PlugdepsError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return ErrorContext::new(PlugdepsError::Other {
            message: format!("Invalid JSON input: {json_error}"),
        })
        .with_suggestion("Pipe the output of 'plugdeps check' into this command, or pass a file containing it");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(PlugdepsError::Other {
        message,
    })
}

/// Map each [`PlugdepsError`] variant to a context with tailored suggestions.
fn create_error_context(error: PlugdepsError) -> ErrorContext {
    match error {
        PlugdepsError::ManifestParseError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the JSON syntax of the plugin's .claude-plugin/extends-plugin.json")
            .with_details("Every entry must be a version constraint string or an object with a \"version\" key"),

        PlugdepsError::VersionParseError { .. } => ErrorContext::new(error)
            .with_suggestion("Use semver versions such as 1.2.3 and ranges such as ^1.2.0, ~1.2.0, >=1.0.0 <2.0.0 or ^1.0.0 || ^2.0.0"),

        PlugdepsError::PluginNotFound { ref suggestion, .. } => {
            let hint = match suggestion {
                Some(name) => format!("Did you mean '{name}'?"),
                None => "Run 'plugdeps check --installed' to see every installed plugin".to_string(),
            };
            ErrorContext::new(error).with_suggestion(hint)
        }

        PlugdepsError::InvalidPluginReference { .. } => ErrorContext::new(error)
            .with_suggestion("Plugin references use the form name or name@marketplace"),

        PlugdepsError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.plugdeps/config.toml or the file passed with --config")
            .with_details("Every field in the configuration file is optional; delete a field to fall back to its default"),

        PlugdepsError::FetchError { .. } => ErrorContext::new(error)
            .with_suggestion("Check your network connection, or run with --no-remote to use local catalogs only"),

        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PlugdepsError::ManifestParseError {
            file: "extends-plugin.json".to_string(),
            reason: "entry 'foo' is missing required key \"version\"".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid manifest extends-plugin.json: entry 'foo' is missing required key \"version\""
        );

        let error = PlugdepsError::AmbiguousPluginReference {
            name: "linter".to_string(),
            candidates: vec!["linter@a".to_string(), "linter@b".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Plugin reference 'linter' is ambiguous: matches linter@a, linter@b"
        );
    }

    #[test]
    fn test_user_friendly_error_keeps_variant() {
        let error = PlugdepsError::PluginNotFound {
            name: "bug-fix".to_string(),
            suggestion: Some("bug-fixes".to_string()),
        };
        let ctx = user_friendly_error(anyhow::Error::from(error));

        assert!(matches!(ctx.error, PlugdepsError::PluginNotFound { .. }));
        assert_eq!(ctx.suggestion.as_deref(), Some("Did you mean 'bug-fixes'?"));
    }

    #[test]
    fn test_user_friendly_error_generic_chain() {
        let error = anyhow::anyhow!("root cause").context("while reading settings");
        let ctx = user_friendly_error(error);

        let message = ctx.error.to_string();
        assert!(message.contains("while reading settings"));
        assert!(message.contains("Caused by:"));
        assert!(message.contains("root cause"));
    }

    #[test]
    fn test_user_friendly_error_malformed_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let ctx = user_friendly_error(anyhow::Error::from(json_error));

        assert!(matches!(ctx.error, PlugdepsError::Other { .. }));
        assert!(ctx.error.to_string().starts_with("Invalid JSON input: "));
        assert!(ctx.suggestion.unwrap().contains("plugdeps check"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(PlugdepsError::ConfigError {
            message: "bad".to_string(),
        })
        .with_details("some details")
        .with_suggestion("fix it");

        let rendered = ctx.to_string();
        assert!(rendered.contains("Configuration error: bad"));
        assert!(rendered.contains("Details: some details"));
        assert!(rendered.contains("Suggestion: fix it"));
    }
}
