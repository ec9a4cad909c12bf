//! Command-line interface for plugdeps.
//!
//! # Commands
//!
//! - `check` - Resolve the dependency manifests of a scope of plugins and
//!   print a JSON report
//! - `steps` - Turn a `check` report into ordered resolution steps
//! - `scan` - List raw dependency-like references found in plugin content
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - Log level on stderr (`RUST_LOG` applies otherwise)
//! - `--config` - Alternate configuration file
//! - `--claude-dir` - Alternate Claude configuration directory
//! - `--no-remote` - Never fetch remote marketplace catalogs
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Every required dependency is satisfied |
//! | 1 | At least one required dependency is unsatisfied |
//! | 2 | The command itself failed |
//!
//! JSON goes to stdout and logs go to stderr, so the commands compose:
//!
//! ```bash
//! plugdeps check --all | plugdeps steps
//! ```

mod check;
mod common;
mod scan;
mod steps;


pub use common::CommandOutcome;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::GlobalConfig;

/// Runtime settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can build one directly.
#[derive(Debug, Default, Clone)]
pub struct CliConfig {
    /// Log filter directive, `None` to defer to `RUST_LOG`
    pub log_level: Option<String>,
    /// Configuration file, `None` for the default location
    pub config_path: Option<PathBuf>,
    /// Claude configuration directory override
    pub claude_dir: Option<PathBuf>,
    /// Disable remote catalog fetches regardless of configuration
    pub no_remote: bool,
}

impl CliConfig {
    /// Load the global configuration and apply the overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but is invalid.
    pub async fn load_global(&self) -> Result<GlobalConfig> {
        let mut config = GlobalConfig::load_with_optional(self.config_path.clone()).await?;
        if let Some(dir) = &self.claude_dir {
            config.claude_dir = Some(dir.to_string_lossy().into_owned());
        }
        if self.no_remote {
            config.remote_catalogs = false;
        }
        Ok(config)
    }
}

/// Plugin dependency checker.
#[derive(Parser)]
#[command(
    name = "plugdeps",
    about = "Validate plugin dependency manifests against the local installation",
    version,
    long_about = "plugdeps reads the extends-plugin.json manifest of each selected plugin, \
                  resolves every declared plugin and system dependency against what is \
                  installed, enabled and offered by known marketplaces, and reports the \
                  result as JSON."
)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logs on stderr)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress everything but errors on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternate configuration file
    ///
    /// Defaults to `~/.plugdeps/config.toml`. A missing file means defaults.
    #[arg(long, global = true, env = "PLUGDEPS_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Claude configuration directory to read installation state from
    ///
    /// Overrides `claude_dir` from the configuration file and
    /// `CLAUDE_CONFIG_DIR`.
    #[arg(long, global = true, value_name = "DIR")]
    claude_dir: Option<PathBuf>,

    /// Only read marketplace catalogs from local checkouts
    #[arg(long, global = true)]
    no_remote: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check declared dependencies and print a JSON report
    ///
    /// Examples:
    ///   plugdeps check                          # enabled plugins
    ///   plugdeps check --all --pretty           # everything marketplaces offer
    ///   plugdeps check --plugin my-plugin@local # one plugin
    Check(check::CheckCommand),

    /// Print resolution steps for a check report
    ///
    /// Reads the report from FILE, or stdin when FILE is omitted or `-`.
    Steps(steps::StepsCommand),

    /// Scan plugin content for dependency-like references
    ///
    /// Examples:
    ///   plugdeps scan --plugin-dir ./my-plugin
    ///   plugdeps scan --marketplace acme --category systemCommand
    Scan(scan::ScanCommand),
}

impl Cli {
    /// Initialize logging and run the selected command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot complete. An unsatisfied
    /// dependency is not an error; it is reported through the outcome.
    pub async fn execute(self) -> Result<CommandOutcome> {
        let config = self.build_config();
        init_logging(config.log_level.as_deref());
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            claude_dir: self.claude_dir.clone(),
            no_remote: self.no_remote,
        }
    }

    /// Run the selected command with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Propagates the command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<CommandOutcome> {
        match self.command {
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Steps(cmd) => cmd.execute().await,
            Commands::Scan(cmd) => cmd.execute(&config).await,
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` is honored when no level is
/// forced; the fallback is `warn`.
fn init_logging(level: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    // A second initialization (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
