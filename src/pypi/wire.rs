//! Raw JSON shapes returned by the upstreams.
//!
//! The index is loose about nulls: almost any field may be missing or
//! `null`, so everything but identifiers is optional here and defaulted
//! during conversion.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PackageFile, PackageInfo, PypiStats, Release, TopPackage, Vulnerability};

// ============================================================================
// PyPI JSON API
// ============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct ProjectResponse {
    pub info: RawInfo,
    #[serde(default)]
    pub urls: Option<Vec<RawFile>>,
    #[serde(default)]
    pub releases: Option<HashMap<String, Option<Vec<RawFile>>>>,
    #[serde(default)]
    pub vulnerabilities: Option<Vec<RawVulnerability>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawInfo {
    pub name: String,
    pub version: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub description_content_type: Option<String>,
    pub author: Option<String>,
    pub author_email: Option<String>,
    pub maintainer: Option<String>,
    pub maintainer_email: Option<String>,
    pub license: Option<String>,
    pub home_page: Option<String>,
    pub download_url: Option<String>,
    pub project_urls: Option<BTreeMap<String, String>>,
    pub platform: Option<String>,
    pub classifiers: Option<Vec<String>>,
    pub keywords: Option<String>,
    pub requires_python: Option<String>,
    pub requires_dist: Option<Vec<String>>,
    pub provides_extra: Option<Vec<String>>,
    pub yanked: Option<bool>,
    pub yanked_reason: Option<String>,
    pub package_url: Option<String>,
    pub project_url: Option<String>,
    pub release_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawFile {
    pub filename: Option<String>,
    pub url: Option<String>,
    pub size: Option<u64>,
    pub md5_digest: Option<String>,
    pub digests: Option<RawDigests>,
    pub upload_time_iso_8601: Option<String>,
    pub upload_time: Option<String>,
    pub python_version: Option<String>,
    pub packagetype: Option<String>,
    pub requires_python: Option<String>,
    pub yanked: Option<bool>,
    pub yanked_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawDigests {
    pub sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawVulnerability {
    pub id: String,
    pub source: Option<String>,
    pub summary: Option<String>,
    pub details: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub fixed_in: Option<Vec<String>>,
    pub link: Option<String>,
    pub withdrawn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatsResponse {
    pub total_packages_size: Option<u64>,
    pub top_packages: Option<HashMap<String, RawTopPackage>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawTopPackage {
    pub size: Option<u64>,
}

/// Empty strings count as missing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// RFC 3339, or a naive timestamp taken as UTC.
pub(super) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|t| t.and_utc())
        })
}

impl RawFile {
    fn upload_time(&self) -> Option<DateTime<Utc>> {
        self.upload_time_iso_8601
            .as_deref()
            .or(self.upload_time.as_deref())
            .and_then(parse_timestamp)
    }

    pub fn into_file(self) -> PackageFile {
        PackageFile {
            upload_time: self.upload_time(),
            filename: self.filename.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            size: self.size.unwrap_or(0),
            md5_digest: self.md5_digest.unwrap_or_default(),
            sha256_digest: self.digests.and_then(|d| d.sha256).unwrap_or_default(),
            python_version: self.python_version.unwrap_or_default(),
            packagetype: self.packagetype.unwrap_or_default(),
            requires_python: non_empty(self.requires_python),
            yanked: self.yanked.unwrap_or(false),
            yanked_reason: non_empty(self.yanked_reason),
        }
    }
}

impl RawVulnerability {
    pub fn into_vulnerability(self) -> Vulnerability {
        Vulnerability {
            withdrawn: self.withdrawn.as_deref().and_then(parse_timestamp),
            id: self.id,
            source: self.source.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            details: self.details.unwrap_or_default(),
            aliases: self.aliases.unwrap_or_default(),
            fixed_in: self.fixed_in.unwrap_or_default(),
            link: non_empty(self.link),
        }
    }
}

impl ProjectResponse {
    pub fn into_package(self) -> PackageInfo {
        let info = self.info;
        PackageInfo {
            name: info.name,
            version: info.version,
            summary: info.summary.unwrap_or_default(),
            description: info.description.unwrap_or_default(),
            description_content_type: non_empty(info.description_content_type),
            author: info.author.unwrap_or_default(),
            author_email: info.author_email.unwrap_or_default(),
            maintainer: info.maintainer.unwrap_or_default(),
            maintainer_email: info.maintainer_email.unwrap_or_default(),
            license: info.license.unwrap_or_default(),
            home_page: info.home_page.unwrap_or_default(),
            download_url: info.download_url.unwrap_or_default(),
            project_urls: info.project_urls.unwrap_or_default(),
            platform: non_empty(info.platform),
            classifiers: info.classifiers.unwrap_or_default(),
            keywords: info.keywords.unwrap_or_default(),
            requires_python: non_empty(info.requires_python),
            requires_dist: info.requires_dist.unwrap_or_default(),
            provides_extra: info.provides_extra.unwrap_or_default(),
            yanked: info.yanked.unwrap_or(false),
            yanked_reason: non_empty(info.yanked_reason),
            package_url: info.package_url.unwrap_or_default(),
            project_url: info.project_url.unwrap_or_default(),
            release_url: info.release_url.unwrap_or_default(),
            files: self
                .urls
                .unwrap_or_default()
                .into_iter()
                .map(RawFile::into_file)
                .collect(),
            vulnerabilities: self
                .vulnerabilities
                .unwrap_or_default()
                .into_iter()
                .map(RawVulnerability::into_vulnerability)
                .collect(),
        }
    }

    /// One record per release that has files, in no particular order.
    pub fn into_releases(self) -> Vec<Release> {
        self.releases
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(version, files)| {
                let files: Vec<PackageFile> = files?.into_iter().map(RawFile::into_file).collect();
                if files.is_empty() {
                    return None;
                }
                Some(Release {
                    uploaded_at: files.iter().filter_map(|f| f.upload_time).min(),
                    file_count: files.len(),
                    total_size: files.iter().map(|f| f.size).sum(),
                    yanked: files.iter().all(|f| f.yanked),
                    version,
                })
            })
            .collect()
    }
}

impl StatsResponse {
    pub fn into_stats(self) -> PypiStats {
        let mut top_packages: Vec<TopPackage> = self
            .top_packages
            .unwrap_or_default()
            .into_iter()
            .map(|(name, raw)| TopPackage {
                name,
                size: raw.size.unwrap_or(0),
            })
            .collect();
        top_packages.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
        PypiStats {
            total_packages_size: self.total_packages_size.unwrap_or(0),
            top_packages,
        }
    }
}

// ============================================================================
// OSV API
// ============================================================================

#[derive(Debug, Serialize)]
pub(super) struct OsvQuery<'a> {
    pub package: OsvPackage<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct OsvPackage<'a> {
    pub name: &'a str,
    pub ecosystem: &'static str,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsvResponse {
    #[serde(default)]
    pub vulns: Option<Vec<OsvVulnerability>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsvVulnerability {
    pub id: String,
    pub summary: Option<String>,
    pub details: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub withdrawn: Option<String>,
    pub references: Option<Vec<OsvReference>>,
    pub affected: Option<Vec<OsvAffected>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsvReference {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsvAffected {
    pub ranges: Option<Vec<OsvRange>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsvRange {
    pub events: Option<Vec<OsvEvent>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsvEvent {
    pub fixed: Option<String>,
}

impl OsvVulnerability {
    pub fn into_vulnerability(self) -> Vulnerability {
        let mut fixed_in: Vec<String> = Vec::new();
        let fixed = self
            .affected
            .into_iter()
            .flatten()
            .flat_map(|a| a.ranges.into_iter().flatten())
            .flat_map(|r| r.events.into_iter().flatten())
            .filter_map(|e| e.fixed);
        for version in fixed {
            if !fixed_in.contains(&version) {
                fixed_in.push(version);
            }
        }

        let link = self
            .references
            .into_iter()
            .flatten()
            .find(|r| matches!(r.kind.as_deref(), Some("ADVISORY" | "WEB")))
            .and_then(|r| non_empty(r.url));

        Vulnerability {
            withdrawn: self.withdrawn.as_deref().and_then(parse_timestamp),
            id: self.id,
            source: "osv".to_string(),
            summary: self.summary.unwrap_or_default(),
            details: self.details.unwrap_or_default(),
            aliases: self.aliases.unwrap_or_default(),
            fixed_in,
            link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_collapse_to_empty_values() {
        let body = r#"{
            "info": {
                "name": "demo", "version": "1.0", "summary": null, "license": null,
                "requires_dist": null, "project_urls": null, "requires_python": "",
                "classifiers": ["A"], "yanked": false
            },
            "urls": null,
            "vulnerabilities": null
        }"#;
        let info = serde_json::from_str::<ProjectResponse>(body).unwrap().into_package();
        assert_eq!(info.name, "demo");
        assert!(info.summary.is_empty());
        assert!(info.requires_dist.is_empty());
        assert!(info.project_urls.is_empty());
        assert_eq!(info.requires_python, None);
        assert_eq!(info.classifiers, vec!["A"]);
        assert!(info.files.is_empty());
    }

    #[test]
    fn releases_skip_versions_without_files() {
        let body = r#"{
            "info": {"name": "demo", "version": "2.0"},
            "releases": {
                "1.0": [
                    {"filename": "a.whl", "size": 10, "upload_time_iso_8601": "2024-01-02T00:00:00.000000Z", "yanked": true},
                    {"filename": "a.tar.gz", "size": 5, "upload_time_iso_8601": "2024-01-01T00:00:00Z", "yanked": false}
                ],
                "1.5": [],
                "2.0": [{"filename": "b.whl", "size": 7, "upload_time": "2024-06-01T12:00:00"}]
            }
        }"#;
        let mut releases = serde_json::from_str::<ProjectResponse>(body)
            .unwrap()
            .into_releases();
        releases.sort_by(|a, b| a.version.cmp(&b.version));

        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].version, "1.0");
        assert_eq!(releases[0].file_count, 2);
        assert_eq!(releases[0].total_size, 15);
        assert!(!releases[0].yanked);
        assert_eq!(
            releases[0].uploaded_at,
            parse_timestamp("2024-01-01T00:00:00Z")
        );
        assert!(releases[1].uploaded_at.is_some());
    }

    #[test]
    fn stats_sorted_by_size() {
        let body = r#"{"total_packages_size": 100,
            "top_packages": {"small": {"size": 1}, "big": {"size": 50}, "mid": {"size": 20}}}"#;
        let stats = serde_json::from_str::<StatsResponse>(body).unwrap().into_stats();
        let names: Vec<&str> = stats.top_packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["big", "mid", "small"]);
    }

    #[test]
    fn osv_fixed_versions_and_link() {
        let body = r#"{"vulns": [{
            "id": "GHSA-x",
            "aliases": ["CVE-2023-1"],
            "references": [
                {"type": "PACKAGE", "url": "https://pypi.org/project/demo"},
                {"type": "WEB", "url": "https://example.org/advisory"}
            ],
            "affected": [{"ranges": [{"type": "ECOSYSTEM", "events": [
                {"introduced": "0"}, {"fixed": "1.2"}, {"introduced": "2.0"}, {"fixed": "2.1"}
            ]}]}, {"ranges": [{"events": [{"fixed": "1.2"}]}]}]
        }]}"#;
        let response: OsvResponse = serde_json::from_str(body).unwrap();
        let vuln = response.vulns.unwrap().remove(0).into_vulnerability();
        assert_eq!(vuln.fixed_in, vec!["1.2", "2.1"]);
        assert_eq!(vuln.link.as_deref(), Some("https://example.org/advisory"));
        assert_eq!(vuln.source, "osv");
    }

    #[test]
    fn osv_empty_response() {
        let response: OsvResponse = serde_json::from_str("{}").unwrap();
        assert!(response.vulns.is_none());
    }
}
