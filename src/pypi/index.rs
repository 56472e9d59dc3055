//! Client for the PyPI JSON API.
//!
//! See: <https://warehouse.pypa.io/api-reference/json.html>

use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use super::Payload;
use super::http::{HttpClient, join_path, parse_base_url};
use super::wire::{ProjectResponse, StatsResponse};
use crate::fetch::{FetchRequest, Upstream, ops};
use crate::pep440::Version;
use crate::types::{PackageInfo, PypiStats, Release};
use crate::{GatewayError, Result};

/// Default base URL for the package index.
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org";

/// The package index upstream.
///
/// Handles the `package_info`, `releases` and `pypi_stats` operations.
/// Every call is exactly one HTTP request; wrap it in a
/// [`Fetcher`](crate::fetch::Fetcher) for caching and retries.
#[derive(Debug, Clone)]
pub struct PypiIndex {
    http: HttpClient,
    base_url: Url,
}

impl PypiIndex {
    /// Upstream name used in logs and metrics.
    pub const NAME: &'static str = "pypi";

    /// Create a client for the index at `base_url` (a mock server in tests).
    pub fn new(http: HttpClient, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Metadata for `name`, or for one `version` of it.
    pub async fn package_info(&self, name: &str, version: Option<&str>) -> Result<PackageInfo> {
        let url = match version {
            Some(version) => join_path(&self.base_url, &["pypi", name, version, "json"])?,
            None => join_path(&self.base_url, &["pypi", name, "json"])?,
        };
        let context = FetchRequest::package_info(name, version).describe();
        let response: ProjectResponse = self
            .http
            .get_json(&context, url, || not_found_message(name, version))
            .await?;
        Ok(response.into_package())
    }

    /// Every release of `name` that has files, newest version first.
    pub async fn releases(&self, name: &str) -> Result<Vec<Release>> {
        let url = join_path(&self.base_url, &["pypi", name, "json"])?;
        let context = FetchRequest::releases(name).describe();
        let response: ProjectResponse = self
            .http
            .get_json(&context, url, || not_found_message(name, None))
            .await?;
        let mut releases = response.into_releases();
        releases.sort_by_cached_key(|r| Reverse((Version::parse(&r.version).ok(), r.version.clone())));
        Ok(releases)
    }

    /// Index-wide storage statistics.
    pub async fn pypi_stats(&self) -> Result<PypiStats> {
        let url = join_path(&self.base_url, &["stats", ""])?;
        let response: StatsResponse = self
            .http
            .get_json(ops::PYPI_STATS, url, || "PyPI statistics endpoint not found".to_string())
            .await?;
        Ok(response.into_stats())
    }
}

fn not_found_message(name: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("package '{name}' version '{version}' not found on PyPI"),
        None => format!("package '{name}' not found on PyPI"),
    }
}

#[async_trait]
impl Upstream for PypiIndex {
    type Value = Payload;

    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Payload> {
        match request.operation() {
            ops::PACKAGE_INFO => {
                let info = self
                    .package_info(request.require("name")?, request.get("version"))
                    .await?;
                Ok(Payload::Package(Arc::new(info)))
            }
            ops::RELEASES => {
                let releases = self.releases(request.require("name")?).await?;
                Ok(Payload::Releases(Arc::new(releases)))
            }
            ops::PYPI_STATS => Ok(Payload::Stats(Arc::new(self.pypi_stats().await?))),
            other => Err(GatewayError::Internal(format!(
                "{} upstream cannot serve operation '{other}'",
                Self::NAME
            ))),
        }
    }
}
