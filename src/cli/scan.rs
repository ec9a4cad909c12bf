//! The `scan` command.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::CliConfig;
use super::common::{CommandOutcome, collect_state, print_json};
use crate::models::PluginReference;
use crate::scanner::{self, MatchCategory, ScanSelection};

/// Scan plugin content for dependency-like references.
///
/// Without a target flag, every enabled plugin is scanned.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Scan one plugin directory (reported under marketplace "local")
    #[arg(long, value_name = "DIR", group = "target")]
    plugin_dir: Option<PathBuf>,

    /// Scan every plugin under a marketplace directory
    #[arg(long, value_name = "DIR", group = "target")]
    marketplace_dir: Option<PathBuf>,

    /// Scan one installed plugin
    #[arg(long, value_name = "NAME[@MARKETPLACE]", group = "target")]
    plugin: Option<PluginReference>,

    /// Scan every installed plugin from a marketplace
    #[arg(long, value_name = "MARKETPLACE", group = "target")]
    marketplace: Option<String>,

    /// Only report matches of this category
    #[arg(long, alias = "type", value_name = "CATEGORY")]
    pub(super) category: Option<MatchCategory>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl ScanCommand {
    pub(super) fn selection(&self) -> ScanSelection {
        if let Some(dir) = &self.plugin_dir {
            ScanSelection::PluginDir(dir.clone())
        } else if let Some(dir) = &self.marketplace_dir {
            ScanSelection::MarketplaceDir(dir.clone())
        } else if let Some(reference) = &self.plugin {
            ScanSelection::Plugin(reference.clone())
        } else if let Some(marketplace) = &self.marketplace {
            ScanSelection::Marketplace(marketplace.clone())
        } else {
            ScanSelection::Enabled
        }
    }

    /// Scan and print the matches as a JSON array.
    ///
    /// Scanning makes no validity judgment, so the outcome is always
    /// satisfied.
    ///
    /// # Errors
    ///
    /// Returns an error when the named plugin does not exist or the output
    /// cannot be written.
    pub async fn execute(self, cli: &CliConfig) -> Result<CommandOutcome> {
        let config = cli.load_global().await?;
        let state = collect_state(&config).await?;

        let targets = scanner::scan_targets(&self.selection(), &state)?;
        let matches = scanner::scan(&targets, self.category).await;
        tracing::debug!(
            target: "scanner",
            "{} match(es) across {} plugin(s)",
            matches.len(),
            targets.len()
        );

        print_json(&matches, self.pretty)?;
        Ok(CommandOutcome::Satisfied)
    }
}
