//! The gateway facade.
//!
//! A [`Gateway`] owns the process-wide result cache and one [`Fetcher`] per
//! upstream, each with its own [`Governor`](crate::governor::Governor). The
//! tool operations in [`tools`] and the JSON entry point in [`dispatch`] are
//! both methods on it.

mod builder;
pub mod dispatch;
pub mod tools;

pub use builder::GatewayBuilder;
pub use dispatch::TOOL_NAMES;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Result;
use crate::cache::{CacheStats, ResultCache};
use crate::config::Config;
use crate::fetch::{FetchRequest, Fetcher};
use crate::pypi::{OsvDatabase, Payload, PypiIndex};
use crate::types::{PackageInfo, PypiStats, Release, Vulnerability};

/// Cached, rate-governed access to PyPI and OSV.
///
/// Cheap to clone; clones share the cache, the governors and the in-flight
/// registries.
#[derive(Clone)]
pub struct Gateway {
    config: Arc<Config>,
    cache: Arc<ResultCache<Payload>>,
    pypi: Fetcher<PypiIndex>,
    osv: Fetcher<OsvDatabase>,
}

impl Gateway {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Build a gateway straight from a loaded [`Config`].
    pub fn from_config(config: Config) -> Result<Self> {
        GatewayBuilder::new().config(config).build()
    }

    pub(crate) fn from_parts(
        config: Config,
        cache: Arc<ResultCache<Payload>>,
        pypi: Fetcher<PypiIndex>,
        osv: Fetcher<OsvDatabase>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            pypi,
            osv,
        }
    }

    /// The configuration the gateway was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared result cache.
    pub fn cache(&self) -> &Arc<ResultCache<Payload>> {
        &self.cache
    }

    /// Fetcher for the package index.
    pub fn pypi(&self) -> &Fetcher<PypiIndex> {
        &self.pypi
    }

    /// Fetcher for the vulnerability database.
    pub fn osv(&self) -> &Fetcher<OsvDatabase> {
        &self.osv
    }

    /// Current cache statistics. Never cached, never rate limited.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Keys with an upstream fetch outstanding, across both upstreams.
    pub fn in_flight(&self) -> usize {
        self.pypi.in_flight() + self.osv.in_flight()
    }

    /// Requests per second allowed for each upstream, keyed by upstream name.
    pub fn rate_limits(&self) -> BTreeMap<String, u32> {
        [
            self.pypi.governor().limiter().max_per_window(),
            self.osv.governor().limiter().max_per_window(),
        ]
        .into_iter()
        .zip([PypiIndex::NAME, OsvDatabase::NAME])
        .map(|(rate, name)| (name.to_string(), rate))
        .collect()
    }

    /// Package metadata, optionally for one version.
    pub async fn package_info(&self, name: &str, version: Option<&str>) -> Result<Arc<PackageInfo>> {
        self.pypi
            .resolve(FetchRequest::package_info(name, version))
            .await?
            .into_package()
    }

    /// Releases with files, newest version first.
    pub async fn releases(&self, name: &str) -> Result<Arc<Vec<Release>>> {
        self.pypi
            .resolve(FetchRequest::releases(name))
            .await?
            .into_releases()
    }

    /// Index-wide statistics.
    pub async fn pypi_stats(&self) -> Result<Arc<PypiStats>> {
        self.pypi
            .resolve(FetchRequest::pypi_stats())
            .await?
            .into_stats()
    }

    /// OSV advisories, optionally for one version.
    pub async fn vulnerabilities(&self, name: &str, version: Option<&str>) -> Result<Arc<Vec<Vulnerability>>> {
        self.osv
            .resolve(FetchRequest::vulnerabilities(name, version))
            .await?
            .into_vulnerabilities()
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("pypi", self.pypi.upstream().base_url())
            .field("osv", self.osv.upstream().base_url())
            .field("cache", &self.cache.stats())
            .finish()
    }
}
