//! Configuration management for plugdeps
//!
//! Two kinds of configuration feed a run:
//!
//! 1. **Global configuration** (`~/.plugdeps/config.toml`) - probe and fetch
//!    settings plus an optional override of the Claude directory
//! 2. **Claude paths** - where the host application keeps the files this
//!    tool reads, all derived from one root directory
//!
//! Command-line flags (`--claude-dir`, `--no-remote`) are applied on top of
//! the loaded [`GlobalConfig`] by the CLI layer.
//!
//! # Modules
//!
//! - `global` - [`GlobalConfig`] loading, defaults and validation
//! - `paths` - [`ClaudePaths`] for the host's files

mod global;
mod paths;

pub use global::{CLAUDE_CONFIG_DIR_ENV, GlobalConfig};
pub use paths::ClaudePaths;
