//! Upstream clients: the PyPI JSON API and the OSV vulnerability database.

pub mod http;
mod index;
mod osv;
mod wire;

pub use http::HttpClient;
pub use index::{DEFAULT_PYPI_URL, PypiIndex};
pub use osv::{DEFAULT_OSV_URL, OsvDatabase};

use std::sync::Arc;

use crate::types::{PackageInfo, PypiStats, Release, Vulnerability};
use crate::{GatewayError, Result};

/// A fetched upstream record, as stored in the shared result cache.
///
/// Records are behind `Arc` so cache hits never deep-copy them.
#[derive(Debug, Clone)]
pub enum Payload {
    Package(Arc<PackageInfo>),
    Releases(Arc<Vec<Release>>),
    Stats(Arc<PypiStats>),
    Vulnerabilities(Arc<Vec<Vulnerability>>),
}

impl Payload {
    /// Short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Package(_) => "package",
            Payload::Releases(_) => "releases",
            Payload::Stats(_) => "stats",
            Payload::Vulnerabilities(_) => "vulnerabilities",
        }
    }

    pub fn into_package(self) -> Result<Arc<PackageInfo>> {
        match self {
            Payload::Package(info) => Ok(info),
            other => Err(mismatch("package", &other)),
        }
    }

    pub fn into_releases(self) -> Result<Arc<Vec<Release>>> {
        match self {
            Payload::Releases(releases) => Ok(releases),
            other => Err(mismatch("releases", &other)),
        }
    }

    pub fn into_stats(self) -> Result<Arc<PypiStats>> {
        match self {
            Payload::Stats(stats) => Ok(stats),
            other => Err(mismatch("stats", &other)),
        }
    }

    pub fn into_vulnerabilities(self) -> Result<Arc<Vec<Vulnerability>>> {
        match self {
            Payload::Vulnerabilities(advisories) => Ok(advisories),
            other => Err(mismatch("vulnerabilities", &other)),
        }
    }
}

fn mismatch(expected: &str, actual: &Payload) -> GatewayError {
    GatewayError::Internal(format!(
        "expected {expected} payload, found {}",
        actual.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_reject_other_variants() {
        let payload = Payload::Stats(Arc::new(PypiStats::default()));
        assert!(payload.clone().into_stats().is_ok());
        let err = payload.into_package().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Internal);
        assert!(err.to_string().contains("found stats"));
    }
}
