//! Marketplace catalogs and how they are fetched.
//!
//! A catalog is the `marketplace.json` document a marketplace publishes:
//!
//! ```json
//! {
//!   "name": "aaronbassett-marketplace",
//!   "plugins": [
//!     { "name": "bug-fixes", "version": "0.4.0", "source": "./plugins/bug-fixes" }
//!   ]
//! }
//! ```
//!
//! Catalogs are only needed when a dependency fails its local check, so
//! they are fetched lazily through a [`CatalogFetcher`]. Two fetchers exist:
//!
//! - [`LocalCatalogFetcher`] reads the copy inside the marketplace's local
//!   checkout
//! - [`HttpCatalogFetcher`] downloads the upstream copy for GitHub and URL
//!   sources, falling back to the local copy when the download fails
//!
//! Fetch failures are values, not panics; the resolver degrades them to
//! "unknown availability".

use crate::core::PlugdepsError;
use crate::manifest::PLUGIN_METADATA_DIR;
use crate::state::sources::{MarketplaceRegistry, MarketplaceSource};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// File name of a marketplace catalog inside [`PLUGIN_METADATA_DIR`].
pub const CATALOG_FILE_NAME: &str = "marketplace.json";

/// One plugin listed in a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPlugin {
    /// Plugin name
    pub name: String,
    /// Published version, if the catalog states one
    pub version: Option<String>,
    /// Relative path of the plugin inside the marketplace, for local sources
    pub source_path: Option<PathBuf>,
}

/// A marketplace's published plugin list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceCatalog {
    /// Marketplace the catalog belongs to
    pub marketplace: String,
    /// Plugins available from it
    pub plugins: Vec<CatalogPlugin>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    plugins: Vec<RawCatalogPlugin>,
}

#[derive(Debug, Deserialize)]
struct RawCatalogPlugin {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    source: Option<Value>,
}

impl MarketplaceCatalog {
    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`PlugdepsError::FetchError`] when the document is not a
    /// catalog.
    pub fn parse(marketplace: &str, content: &str) -> Result<Self, PlugdepsError> {
        let raw: RawCatalog =
            serde_json::from_str(content).map_err(|e| PlugdepsError::FetchError {
                marketplace: marketplace.to_string(),
                reason: format!("invalid catalog: {e}"),
            })?;

        let plugins = raw
            .plugins
            .into_iter()
            .map(|plugin| CatalogPlugin {
                name: plugin.name,
                version: plugin.version,
                source_path: plugin.source.as_ref().and_then(Value::as_str).map(PathBuf::from),
            })
            .collect();

        Ok(Self {
            marketplace: marketplace.to_string(),
            plugins,
        })
    }

    /// Every listing for `name`.
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CatalogPlugin> + 'a {
        self.plugins.iter().filter(move |plugin| plugin.name == name)
    }
}

/// Path of the local catalog copy inside a marketplace checkout.
#[must_use]
pub fn local_catalog_path(location: &Path) -> PathBuf {
    location.join(PLUGIN_METADATA_DIR).join(CATALOG_FILE_NAME)
}

/// Read the local catalog copy of a marketplace.
///
/// # Errors
///
/// Returns [`PlugdepsError::FetchError`] when the marketplace has no local
/// checkout or its catalog is missing or malformed.
pub async fn read_local_catalog(
    marketplace: &MarketplaceRegistry,
) -> Result<MarketplaceCatalog, PlugdepsError> {
    let location = marketplace.location.as_ref().ok_or_else(|| PlugdepsError::FetchError {
        marketplace: marketplace.name.clone(),
        reason: "marketplace has no local checkout".to_string(),
    })?;

    let path = local_catalog_path(location);
    let content =
        tokio::fs::read_to_string(&path).await.map_err(|e| PlugdepsError::FetchError {
            marketplace: marketplace.name.clone(),
            reason: format!("cannot read {}: {e}", path.display()),
        })?;

    debug!(target: "catalog", "read local catalog for '{}' from {}", marketplace.name, path.display());
    MarketplaceCatalog::parse(&marketplace.name, &content)
}

/// Source of marketplace catalogs.
///
/// Implementations must not panic; every failure is returned as a
/// [`PlugdepsError::FetchError`].
pub trait CatalogFetcher: Send + Sync {
    /// Fetch the catalog of `marketplace`.
    fn fetch(
        &self,
        marketplace: &MarketplaceRegistry,
    ) -> impl Future<Output = Result<MarketplaceCatalog, PlugdepsError>> + Send;
}

/// Reads catalogs from local marketplace checkouts only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCatalogFetcher;

impl CatalogFetcher for LocalCatalogFetcher {
    async fn fetch(
        &self,
        marketplace: &MarketplaceRegistry,
    ) -> Result<MarketplaceCatalog, PlugdepsError> {
        read_local_catalog(marketplace).await
    }
}

/// Downloads upstream catalogs, falling back to the local copy.
#[derive(Debug, Clone)]
pub struct HttpCatalogFetcher {
    client: reqwest::Client,
}

impl HttpCatalogFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`PlugdepsError::Other`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, PlugdepsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlugdepsError::Other {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
        })
    }

    async fn fetch_remote(
        &self,
        marketplace: &str,
        url: &str,
    ) -> Result<MarketplaceCatalog, PlugdepsError> {
        let fetch_error = |reason: String| PlugdepsError::FetchError {
            marketplace: marketplace.to_string(),
            reason,
        };

        debug!(target: "catalog", "fetching catalog for '{marketplace}' from {url}");
        let response =
            self.client.get(url).send().await.map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {} from {url}", response.status())));
        }

        let content = response.text().await.map_err(|e| fetch_error(e.to_string()))?;
        MarketplaceCatalog::parse(marketplace, &content)
    }
}

impl CatalogFetcher for HttpCatalogFetcher {
    async fn fetch(
        &self,
        marketplace: &MarketplaceRegistry,
    ) -> Result<MarketplaceCatalog, PlugdepsError> {
        let Some(url) = remote_catalog_url(&marketplace.source) else {
            return read_local_catalog(marketplace).await;
        };

        match self.fetch_remote(&marketplace.name, &url).await {
            Ok(catalog) => Ok(catalog),
            Err(remote_error) => {
                warn!(target: "catalog", "{remote_error}; falling back to the local copy");
                read_local_catalog(marketplace).await.map_err(|local_error| {
                    PlugdepsError::FetchError {
                        marketplace: marketplace.name.clone(),
                        reason: format!("remote: {remote_error}; local: {local_error}"),
                    }
                })
            }
        }
    }
}

/// URL of the upstream catalog for sources that have one.
///
/// GitHub sources map to the raw file on the default branch; URL sources
/// are used as-is when they point at a `.json` document.
#[must_use]
pub fn remote_catalog_url(source: &MarketplaceSource) -> Option<String> {
    match source {
        MarketplaceSource::Github {
            repo,
        } => Some(format!(
            "https://raw.githubusercontent.com/{}/HEAD/{PLUGIN_METADATA_DIR}/{CATALOG_FILE_NAME}",
            repo.trim_matches('/')
        )),
        MarketplaceSource::Url {
            url,
        } if url.ends_with(".json") => Some(url.clone()),
        _ => None,
    }
}
