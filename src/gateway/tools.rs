//! Tool operations.
//!
//! Each tool validates its arguments locally, so malformed input fails with
//! [`GatewayError::InvalidRequest`] before any upstream call, then resolves
//! what it needs through the gateway's fetchers and shapes a report.

use std::cmp::Ordering;

use chrono::Utc;
use tracing::{instrument, warn};

use super::Gateway;
use crate::analysis::{
    DESCRIPTION_LIMIT, assess_health, assess_security, extract_keywords, format_file_size,
    group_dependencies, merge_advisories, package_type_description, python_classifiers,
    release_activity, truncate_description, validate_package_name,
};
use crate::pep440::{SpecifierSet, Version, VersionKind, compare_version_strings, parse_requirements};
use crate::pypi::{OsvDatabase, PypiIndex};
use crate::types::{
    CacheInfo, CompatibilityReport, ComparisonOutcome, DependencyReport, FileReport, HealthReport,
    PackageInfo, PackageReport, ReleaseActivityReport, StatsReport, TopPackageReport, VersionComparison,
    VersionEntry, VersionSummary, VersionsReport, VulnerabilityReport,
};
use crate::{GatewayError, Result};

/// Default `limit` for [`Gateway::get_release_activity`].
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;
/// Default `window_days` for [`Gateway::get_release_activity`].
pub const DEFAULT_WINDOW_DAYS: u32 = 365;
/// Default interpreter for [`Gateway::check_compatibility`].
pub const DEFAULT_PYTHON_VERSION: &str = "3.11";

const MAX_ACTIVITY_LIMIT: usize = 200;
const MAX_WINDOW_DAYS: u32 = 1825;
const TOP_PACKAGES: usize = 20;

impl Gateway {
    /// Metadata for a package, optionally pinned to `version`.
    #[instrument(skip(self))]
    pub async fn get_package_info(
        &self,
        package_name: &str,
        version: Option<&str>,
        include_files: bool,
    ) -> Result<PackageReport> {
        let name = check_package_name(package_name)?;
        let version = check_version("version", version)?;
        let info = self.package_info(name, version).await?;

        let files = include_files.then(|| {
            info.files
                .iter()
                .map(|file| FileReport {
                    filename: file.filename.clone(),
                    url: file.url.clone(),
                    size: file.size,
                    size_formatted: format_file_size(file.size),
                    kind: package_type_description(&file.packagetype),
                    python_version: file.python_version.clone(),
                    upload_time: file.upload_time,
                    yanked: file.yanked,
                })
                .collect()
        });

        Ok(PackageReport {
            name: info.name.clone(),
            version: info.version.clone(),
            summary: info.summary.clone(),
            description: truncate_description(&info.description, DESCRIPTION_LIMIT),
            author: info.author.clone(),
            author_email: info.author_email.clone(),
            maintainer: info.maintainer.clone(),
            maintainer_email: info.maintainer_email.clone(),
            license: info.license.clone(),
            home_page: info.home_page.clone(),
            project_urls: info.project_urls.clone(),
            classifiers: info.classifiers.clone(),
            keywords: extract_keywords(&info.keywords),
            requires_python: info.requires_python.clone(),
            dependencies: parse_requirements(info.requires_dist.iter().map(String::as_str)),
            extras: info.provides_extra.clone(),
            yanked: info.yanked,
            yanked_reason: info.yanked_reason.clone(),
            package_url: info.package_url.clone(),
            project_url: info.project_url.clone(),
            release_url: info.release_url.clone(),
            version_type: VersionKind::classify(&info.version),
            vulnerabilities: info.vulnerabilities.clone(),
            files,
        })
    }

    /// Versions with files, newest first.
    ///
    /// `total_versions` counts every release; `limit` applies after the
    /// pre-release filter.
    #[instrument(skip(self))]
    pub async fn get_package_versions(
        &self,
        package_name: &str,
        limit: Option<usize>,
        include_prereleases: bool,
    ) -> Result<VersionsReport> {
        let name = check_package_name(package_name)?;
        if limit == Some(0) {
            return Err(invalid("limit must be at least 1"));
        }
        let releases = self.releases(name).await?;
        let latest = releases.first().map(|r| r.version.clone());

        let versions: Vec<VersionEntry> = releases
            .iter()
            .map(|r| VersionEntry {
                kind: VersionKind::classify(&r.version),
                is_latest: latest.as_deref() == Some(r.version.as_str()),
                version: r.version.clone(),
            })
            .filter(|entry| include_prereleases || entry.kind == VersionKind::Stable)
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        Ok(VersionsReport {
            package_name: name.to_string(),
            total_versions: releases.len(),
            returned_versions: versions.len(),
            latest_version: latest,
            versions,
        })
    }

    /// Release cadence over the newest `limit` releases.
    #[instrument(skip(self))]
    pub async fn get_release_activity(
        &self,
        package_name: &str,
        limit: usize,
        window_days: u32,
    ) -> Result<ReleaseActivityReport> {
        let name = check_package_name(package_name)?;
        if !(1..=MAX_ACTIVITY_LIMIT).contains(&limit) {
            return Err(invalid(format!(
                "limit must be between 1 and {MAX_ACTIVITY_LIMIT}, got {limit}"
            )));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
            return Err(invalid(format!(
                "window_days must be between 1 and {MAX_WINDOW_DAYS}, got {window_days}"
            )));
        }

        let releases = self.releases(name).await?;
        let history = &releases[..limit.min(releases.len())];
        let activity = release_activity(history, window_days, Utc::now());

        Ok(ReleaseActivityReport {
            package_name: name.to_string(),
            total_releases: activity.releases.len(),
            recent_releases: activity.recent_releases,
            window_days,
            first_release: activity.first_release,
            latest_release: activity.latest_release,
            release_cadence_days: activity.average_interval_days,
            cadence_classification: activity.cadence,
            releases: activity.releases,
        })
    }

    /// Compare two releases of the same package.
    #[instrument(skip(self))]
    pub async fn compare_versions(
        &self,
        package_name: &str,
        version1: &str,
        version2: &str,
    ) -> Result<VersionComparison> {
        let name = check_package_name(package_name)?;
        let v1 = require_version("version1", version1)?;
        let v2 = require_version("version2", version2)?;

        let (info1, info2) = tokio::try_join!(
            self.package_info(name, Some(v1)),
            self.package_info(name, Some(v2)),
        )?;

        let (result, newer_version) = match compare_version_strings(v1, v2) {
            Ordering::Greater => (1, v1.to_string()),
            Ordering::Less => (-1, v2.to_string()),
            Ordering::Equal => (0, "equal".to_string()),
        };

        Ok(VersionComparison {
            package_name: name.to_string(),
            version1: version_summary(v1, &info1),
            version2: version_summary(v2, &info2),
            comparison: ComparisonOutcome {
                result,
                newer_version,
                is_upgrade: result > 0,
                is_downgrade: result < 0,
            },
        })
    }

    /// Whether a Python interpreter satisfies the release's `Requires-Python`.
    ///
    /// An unparsable requirement is reported in the notes rather than failing
    /// the call; it counts as incompatible.
    #[instrument(skip(self))]
    pub async fn check_compatibility(
        &self,
        package_name: &str,
        version: Option<&str>,
        python_version: &str,
    ) -> Result<CompatibilityReport> {
        let name = check_package_name(package_name)?;
        let version = check_version("version", version)?;
        let python = Version::parse(python_version.trim())
            .map_err(|_| invalid(format!("invalid python_version '{python_version}'")))?;
        let info = self.package_info(name, version).await?;

        let mut notes = Vec::new();
        let requirement = info
            .requires_python
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());
        let is_compatible = match requirement {
            None => true,
            Some(requirement) => match SpecifierSet::parse(requirement) {
                Ok(set) if set.contains(&python) => true,
                Ok(_) => {
                    notes.push(format!(
                        "Python {python_version} does not satisfy requirement: {requirement}"
                    ));
                    false
                }
                Err(_) => {
                    notes.push(format!("Could not parse Python requirement: {requirement}"));
                    false
                }
            },
        };

        Ok(CompatibilityReport {
            package_name: info.name.clone(),
            package_version: info.version.clone(),
            python_version: python_version.trim().to_string(),
            is_compatible,
            requires_python: info.requires_python.clone(),
            compatibility_notes: notes,
            classifiers: python_classifiers(&info.classifiers),
        })
    }

    /// Declared requirements grouped by purpose.
    #[instrument(skip(self))]
    pub async fn get_dependencies(
        &self,
        package_name: &str,
        version: Option<&str>,
        include_extras: bool,
    ) -> Result<DependencyReport> {
        let name = check_package_name(package_name)?;
        let version = check_version("version", version)?;
        let info = self.package_info(name, version).await?;

        let requirements = parse_requirements(info.requires_dist.iter().map(String::as_str));
        let total_dependencies = requirements.len();
        let groups = group_dependencies(requirements);

        Ok(DependencyReport {
            package_name: info.name.clone(),
            package_version: info.version.clone(),
            total_dependencies,
            runtime_dependencies: groups.runtime,
            development_dependencies: groups.development,
            available_extras: info.provides_extra.clone(),
            optional_dependencies: include_extras.then_some(groups.optional),
        })
    }

    /// Known advisories from PyPI and OSV, scored.
    ///
    /// An OSV failure does not fail the call: the report falls back to the
    /// advisories PyPI embeds and carries the error in `osv_error`.
    #[instrument(skip(self))]
    pub async fn check_vulnerabilities(
        &self,
        package_name: &str,
        version: Option<&str>,
    ) -> Result<VulnerabilityReport> {
        let name = check_package_name(package_name)?;
        let version = check_version("version", version)?;
        let info = self.package_info(name, version).await?;

        // Query OSV for the resolved release, so "latest" means the same thing
        // to both sources.
        let mut sources = vec![PypiIndex::NAME.to_string()];
        let (osv_advisories, osv_error) = match self.vulnerabilities(name, Some(&info.version)).await {
            Ok(advisories) => {
                sources.push(OsvDatabase::NAME.to_string());
                (advisories.as_ref().clone(), None)
            }
            Err(e) => {
                warn!(package = name, error = %e, "vulnerability database unavailable");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let advisories = merge_advisories(info.vulnerabilities.clone(), osv_advisories);
        let assessment = assess_security(advisories);

        Ok(VulnerabilityReport {
            package_name: info.name.clone(),
            package_version: info.version.clone(),
            vulnerability_count: assessment.vulnerabilities.len(),
            has_vulnerabilities: !assessment.vulnerabilities.is_empty(),
            vulnerabilities: assessment.vulnerabilities,
            severity_breakdown: assessment.severity_breakdown,
            overall_severity: assessment.overall_severity,
            overall_severity_score: assessment.overall_score,
            security_status: assessment.status,
            recommendation: assessment.recommendation,
            sources,
            osv_error,
        })
    }

    /// Index-wide storage statistics and the largest projects.
    #[instrument(skip(self))]
    pub async fn get_pypi_stats(&self) -> Result<StatsReport> {
        let stats = self.pypi_stats().await?;
        let top_packages: Vec<TopPackageReport> = stats
            .top_packages
            .iter()
            .take(TOP_PACKAGES)
            .map(|p| TopPackageReport {
                name: p.name.clone(),
                size: p.size,
                size_formatted: format_file_size(p.size),
            })
            .collect();

        Ok(StatsReport {
            total_packages_size: stats.total_packages_size,
            total_size_formatted: format_file_size(stats.total_packages_size),
            top_packages_count: top_packages.len(),
            top_packages,
        })
    }

    /// Maintenance health score for a release.
    #[instrument(skip(self))]
    pub async fn get_package_health(
        &self,
        package_name: &str,
        version: Option<&str>,
    ) -> Result<HealthReport> {
        let name = check_package_name(package_name)?;
        let version = check_version("version", version)?;
        let (info, releases) = tokio::try_join!(self.package_info(name, version), self.releases(name))?;

        let versions: Vec<String> = releases.iter().map(|r| r.version.clone()).collect();
        let assessment = assess_health(&info, &versions, Utc::now());

        Ok(HealthReport {
            package_name: info.name.clone(),
            package_version: info.version.clone(),
            health_score: assessment.score,
            health_status: assessment.status,
            health_notes: assessment.notes,
            scoring_breakdown: assessment.breakdown,
            total_versions: versions.len(),
            is_latest: versions.first() == Some(&info.version),
            has_vulnerabilities: !info.vulnerabilities.is_empty(),
            is_yanked: info.yanked,
            version_type: VersionKind::classify(&info.version),
            release_cadence: assessment.release_cadence,
            latest_release_age_days: assessment.latest_release_age_days,
        })
    }

    /// Cache statistics and limits.
    pub fn cache_info(&self) -> CacheInfo {
        let stats = self.cache_stats();
        CacheInfo {
            cache_stats: stats,
            cache_enabled: true,
            cache_ttl_seconds: self.cache().ttl().as_secs(),
            cache_hit_rate: stats.hit_rate,
            in_flight: self.in_flight(),
            rate_limits: self.rate_limits(),
        }
    }
}

fn version_summary(version: &str, info: &PackageInfo) -> VersionSummary {
    VersionSummary {
        version: version.to_string(),
        kind: VersionKind::classify(version),
        upload_time: info.first_upload(),
        dependencies_count: info.requires_dist.len(),
        vulnerabilities_count: info.vulnerabilities.len(),
    }
}

fn invalid(message: impl Into<String>) -> GatewayError {
    GatewayError::InvalidRequest(message.into())
}

fn check_package_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if validate_package_name(trimmed) {
        Ok(trimmed)
    } else {
        Err(invalid(format!("invalid package name '{name}'")))
    }
}

/// An optional version argument; blank counts as absent.
fn check_version<'a>(field: &str, version: Option<&'a str>) -> Result<Option<&'a str>> {
    match version.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => require_version(field, v).map(Some),
        None => Ok(None),
    }
}

fn require_version<'a>(field: &str, version: &'a str) -> Result<&'a str> {
    let trimmed = version.trim();
    Version::parse(trimmed).map_err(|_| invalid(format!("invalid {field} '{version}'")))?;
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn package_names_are_validated() {
        assert_eq!(check_package_name(" requests ").unwrap(), "requests");
        assert_eq!(check_package_name("zope.interface").unwrap(), "zope.interface");
        for bad in ["", "-leading", "trailing-", "sp ace", "../etc"] {
            let err = check_package_name(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest, "{bad:?}");
        }
    }

    #[test]
    fn blank_versions_are_absent() {
        assert_eq!(check_version("version", None).unwrap(), None);
        assert_eq!(check_version("version", Some("  ")).unwrap(), None);
        assert_eq!(check_version("version", Some(" 2.0 ")).unwrap(), Some("2.0"));
    }

    #[test]
    fn malformed_versions_name_the_field() {
        let err = require_version("version2", "not.a.version!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("version2"));
    }
}
