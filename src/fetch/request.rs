//! Fetch requests and their cache keys.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CacheKey;
use crate::{GatewayError, Result};

/// Operation names understood by the built-in upstreams.
pub mod ops {
    /// Package metadata, optionally for one version.
    pub const PACKAGE_INFO: &str = "package_info";
    /// Every release of a package that has files.
    pub const RELEASES: &str = "releases";
    /// Index-wide statistics.
    pub const PYPI_STATS: &str = "pypi_stats";
    /// Advisories affecting a package, optionally one version.
    pub const VULNERABILITIES: &str = "vulnerabilities";
}

/// One logical upstream request: an operation plus its parameters.
///
/// Parameters live in a sorted map, so the order callers add them in never
/// changes the key. Optional parameters are omitted rather than stored as
/// empty strings, so "absent" has exactly one representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FetchRequest {
    operation: String,
    params: BTreeMap<String, String>,
}

impl FetchRequest {
    /// Create a request with no parameters.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add a parameter only when a value is present.
    pub fn optional_param(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Metadata for `name`, optionally pinned to `version`.
    pub fn package_info(name: &str, version: Option<&str>) -> Self {
        Self::new(ops::PACKAGE_INFO)
            .param("name", normalize_package_name(name))
            .optional_param("version", normalize_version(version))
    }

    /// Release history for `name`.
    pub fn releases(name: &str) -> Self {
        Self::new(ops::RELEASES).param("name", normalize_package_name(name))
    }

    /// Index-wide statistics.
    pub fn pypi_stats() -> Self {
        Self::new(ops::PYPI_STATS)
    }

    /// Advisories for `name`, optionally pinned to `version`.
    pub fn vulnerabilities(name: &str, version: Option<&str>) -> Self {
        Self::new(ops::VULNERABILITIES)
            .param("name", normalize_package_name(name))
            .optional_param("version", normalize_version(version))
    }

    /// The operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Look up a parameter that must be present.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| {
            GatewayError::InvalidRequest(format!(
                "{} requires parameter '{name}'",
                self.operation
            ))
        })
    }

    /// All parameters in key order.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Deterministic cache key for this request.
    ///
    /// The key is the JSON encoding of the request. JSON string escaping
    /// keeps distinct requests distinct even when values contain separators.
    pub fn cache_key(&self) -> Result<CacheKey> {
        if self.operation.is_empty() {
            return Err(GatewayError::Internal(
                "fetch request without an operation".to_string(),
            ));
        }
        let encoded = serde_json::to_string(self).map_err(|e| {
            GatewayError::Internal(format!(
                "failed to encode cache key for {}: {e}",
                self.operation
            ))
        })?;
        CacheKey::new(self.operation.clone(), encoded)
    }

    /// Short human-readable description for error messages.
    pub fn describe(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if params.is_empty() {
            self.operation.clone()
        } else {
            format!("{}({})", self.operation, params.join(", "))
        }
    }
}

/// Normalize a project name per PEP 503: runs of `-`, `_` and `.` collapse
/// to a single `-`, and the result is lowercased.
pub fn normalize_package_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

fn normalize_version(version: Option<&str>) -> Option<String> {
    version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
