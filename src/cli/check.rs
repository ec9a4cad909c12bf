//! The `check` command.

use anyhow::Result;
use clap::Args;

use super::CliConfig;
use super::common::{CommandOutcome, collect_state, print_json};
use crate::models::{PluginReference, ScopeFilter, ScopeKind, ScopeSelector};
use crate::probe::SystemProber;
use crate::resolution::map_to_action;
use crate::resolver::{CheckReport, DependencyResolver};
use crate::state::{CatalogFetcher, HttpCatalogFetcher, InstallationState, LocalCatalogFetcher};

/// Check declared dependencies of a scope of plugins.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Check every installed plugin, enabled or not
    #[arg(long, conflicts_with = "all")]
    installed: bool,

    /// Check installed plugins plus everything known marketplaces offer
    #[arg(long)]
    all: bool,

    /// Only check this plugin
    #[arg(long, value_name = "NAME[@MARKETPLACE]", conflicts_with = "marketplace")]
    plugin: Option<PluginReference>,

    /// Only check plugins from this marketplace
    #[arg(long, value_name = "MARKETPLACE")]
    marketplace: Option<String>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Add the resolution action to every result
    #[arg(long)]
    with_actions: bool,
}

impl CheckCommand {
    pub(super) fn selector(&self) -> ScopeSelector {
        let kind = if self.all {
            ScopeKind::All
        } else if self.installed {
            ScopeKind::Installed
        } else {
            ScopeKind::Enabled
        };

        let filter = match (&self.plugin, &self.marketplace) {
            (Some(reference), _) => ScopeFilter::Plugin(reference.clone()),
            (None, Some(marketplace)) => ScopeFilter::Marketplace(marketplace.clone()),
            (None, None) => ScopeFilter::None,
        };

        ScopeSelector::new(kind).with_filter(filter)
    }

    /// Run the check and print the report.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration, an unknown plugin filter,
    /// or a failure to write the report.
    pub async fn execute(self, cli: &CliConfig) -> Result<CommandOutcome> {
        let config = cli.load_global().await?;
        let state = collect_state(&config).await?;
        let selector = self.selector();
        let prober = SystemProber::new(config.version_flags.clone(), config.probe_timeout());

        let mut report = if config.remote_catalogs {
            let fetcher = HttpCatalogFetcher::new(config.fetch_timeout())?;
            run(prober, fetcher, &selector, state).await?
        } else {
            tracing::debug!(target: "catalog", "remote catalogs disabled, reading local checkouts only");
            run(prober, LocalCatalogFetcher, &selector, state).await?
        };

        if self.with_actions {
            for result in report.results_mut() {
                result.action = Some(map_to_action(result));
            }
        }

        print_json(&report, self.pretty)?;
        Ok(CommandOutcome::from_passed(report.passes()))
    }
}

async fn run<F: CatalogFetcher>(
    prober: SystemProber,
    fetcher: F,
    selector: &ScopeSelector,
    state: InstallationState,
) -> Result<CheckReport> {
    let resolver = DependencyResolver::new(prober, fetcher);
    Ok(resolver.resolve(selector, state).await?)
}
