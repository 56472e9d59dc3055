//! Package index records.
//!
//! Typed views of what the upstreams return, with nulls and missing fields
//! already collapsed to empty values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one release of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub summary: String,
    pub description: String,
    pub description_content_type: Option<String>,
    pub author: String,
    pub author_email: String,
    pub maintainer: String,
    pub maintainer_email: String,
    pub license: String,
    pub home_page: String,
    pub download_url: String,
    pub project_urls: BTreeMap<String, String>,
    pub platform: Option<String>,
    pub classifiers: Vec<String>,
    /// Raw keywords field, as the author wrote it.
    pub keywords: String,
    pub requires_python: Option<String>,
    /// Raw `Requires-Dist` entries.
    pub requires_dist: Vec<String>,
    pub provides_extra: Vec<String>,
    pub yanked: bool,
    pub yanked_reason: Option<String>,
    pub package_url: String,
    pub project_url: String,
    pub release_url: String,
    /// Distribution files of this release.
    pub files: Vec<PackageFile>,
    /// Advisories the index itself reports for this release.
    pub vulnerabilities: Vec<Vulnerability>,
}

impl PackageInfo {
    /// Upload time of the newest file, if any file has one.
    pub fn latest_upload(&self) -> Option<DateTime<Utc>> {
        self.files.iter().filter_map(|f| f.upload_time).max()
    }

    /// Upload time of the first listed file.
    pub fn first_upload(&self) -> Option<DateTime<Utc>> {
        self.files.first().and_then(|f| f.upload_time)
    }
}

/// A wheel, sdist or other distribution file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageFile {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub md5_digest: String,
    pub sha256_digest: String,
    pub upload_time: Option<DateTime<Utc>>,
    pub python_version: String,
    /// Distribution type, e.g. `bdist_wheel` or `sdist`.
    pub packagetype: String,
    pub requires_python: Option<String>,
    pub yanked: bool,
    pub yanked_reason: Option<String>,
}

/// A security advisory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    /// Where the advisory came from, e.g. `osv`.
    pub source: String,
    pub summary: String,
    pub details: String,
    pub aliases: Vec<String>,
    /// Versions that fix the issue.
    pub fixed_in: Vec<String>,
    pub link: Option<String>,
    pub withdrawn: Option<DateTime<Utc>>,
}

/// One release in a project's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    /// Earliest upload time among the release's files.
    pub uploaded_at: Option<DateTime<Utc>>,
    pub file_count: usize,
    /// Combined size of all files in bytes.
    pub total_size: u64,
    /// Every file of the release is yanked.
    pub yanked: bool,
}

/// Index-wide storage statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PypiStats {
    pub total_packages_size: u64,
    /// Largest projects, biggest first.
    pub top_packages: Vec<TopPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopPackage {
    pub name: String,
    pub size: u64,
}
