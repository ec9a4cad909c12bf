//! plugdeps - plugin dependency resolution and validation
//!
//! Plugins for Claude declare what they depend on in
//! `.claude-plugin/extends-plugin.json`: other plugins (by
//! `name@marketplace`), system commands, and optional variants of both, each
//! with a semver constraint. plugdeps checks those declarations against the
//! local installation and reports, per dependency, whether it is installed,
//! enabled, at a satisfying version, and obtainable from a known marketplace.
//!
//! # Architecture Overview
//!
//! A run reads three kinds of input and never writes anything:
//!
//! - the installation state under the Claude configuration directory
//!   (installed plugins, enabled flags, known marketplaces)
//! - the dependency manifests of the plugins in scope
//! - the system, through version probes of the commands manifests name
//!
//! ```text
//! InstallationState ──┐
//! manifests ──────────┼──> DependencyResolver ──> CheckReport ──> resolution steps
//! probes / catalogs ──┘
//! ```
//!
//! # Core Modules
//!
//! - [`cli`] - `check`, `steps` and `scan` subcommands
//! - [`config`] - Global configuration (`~/.plugdeps/config.toml`) and Claude paths
//! - [`core`] - Error types and user-facing error rendering
//! - [`manifest`] - Parsing `extends-plugin.json`
//! - [`models`] - Plugin references and scope selectors
//! - [`probe`] - Version probes for system commands
//! - [`resolution`] - Mapping results to actions and formatting steps
//! - [`resolver`] - Scope selection and dependency checking
//! - [`scanner`] - Heuristic scan of plugin content for dependency-like text
//! - [`state`] - Installation state and marketplace catalogs
//! - [`version`] - Version parsing and constraint evaluation
//!
//! # Example
//!
//! ```rust,no_run
//! use plugdeps_cli::config::ClaudePaths;
//! use plugdeps_cli::models::{ScopeKind, ScopeSelector};
//! use plugdeps_cli::probe::SystemProber;
//! use plugdeps_cli::resolver::DependencyResolver;
//! use plugdeps_cli::state::{InstallationState, LocalCatalogFetcher};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let state = InstallationState::collect(&ClaudePaths::new("/home/me/.claude")).await;
//! let resolver = DependencyResolver::new(SystemProber::default(), LocalCatalogFetcher);
//! let report = resolver.resolve(&ScopeSelector::new(ScopeKind::Enabled), state).await?;
//! println!("passes: {}", report.passes());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod manifest;
pub mod models;
pub mod probe;
pub mod resolution;
pub mod resolver;
pub mod scanner;
pub mod state;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
