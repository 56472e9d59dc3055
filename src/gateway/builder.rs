//! Builder for configuring gateway instances

use std::sync::Arc;

use tracing::info;

use super::Gateway;
use crate::Result;
use crate::cache::ResultCache;
use crate::config::Config;
use crate::fetch::Fetcher;
use crate::governor::{Governor, RetryConfig};
use crate::pypi::{HttpClient, OsvDatabase, PypiIndex};

/// Builder for configuring gateway instances.
///
/// Starts from [`Config::default`]; individual setters override single
/// fields of whatever config was supplied.
#[derive(Debug, Clone, Default)]
pub struct GatewayBuilder {
    config: Config,
    retry: Option<RetryConfig>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Point the package-index client at another server (a mirror or a mock).
    pub fn pypi_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.pypi_base_url = url.into();
        self
    }

    /// Point the vulnerability client at another server.
    pub fn osv_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.osv_base_url = url.into();
        self
    }

    /// Set the per-attempt timeout in seconds.
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Set the sustained request rate for each upstream.
    pub fn rate_limit(mut self, per_second: u32) -> Self {
        self.config.rate_limit = per_second;
        self
    }

    /// Set cache capacity and entry lifetime.
    pub fn cache(mut self, max_size: usize, ttl_secs: u64) -> Self {
        self.config.cache_max_size = max_size;
        self.config.cache_ttl_secs = ttl_secs;
        self
    }

    /// Replace the retry policy derived from the config, backoff included.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Validate the configuration and assemble the gateway.
    pub fn build(self) -> Result<Gateway> {
        let config = self.config;
        config.validate()?;

        let http = HttpClient::new(&config.user_agent, config.timeout()?)?;
        let cache = Arc::new(ResultCache::new(&config.cache_config()));

        let mut governor_config = config.governor_config()?;
        if let Some(retry) = self.retry {
            governor_config = governor_config.retry(retry);
        }

        let pypi = Fetcher::new(
            PypiIndex::new(http.clone(), &config.pypi_base_url)?,
            Arc::clone(&cache),
            Arc::new(Governor::new(PypiIndex::NAME, governor_config.clone())),
        );
        let osv = Fetcher::new(
            OsvDatabase::new(http, &config.osv_base_url)?,
            Arc::clone(&cache),
            Arc::new(Governor::new(OsvDatabase::NAME, governor_config)),
        );

        info!(
            version = %crate::version::version_string(),
            pypi = %config.pypi_base_url,
            osv = %config.osv_base_url,
            rate_limit = config.rate_limit,
            max_retries = config.max_retries,
            cache_ttl_secs = config.cache_ttl_secs,
            cache_max_size = config.cache_max_size,
            "gateway ready"
        );

        Ok(Gateway::from_parts(config, cache, pypi, osv))
    }
}
