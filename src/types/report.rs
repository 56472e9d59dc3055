//! Tool report records.
//!
//! Each gateway tool returns one of these; they serialize to the JSON the
//! tool hands back to its caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Release, Vulnerability};
use crate::cache::CacheStats;
use crate::pep440::{Requirement, VersionKind};

/// Output of `get_package_info`.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub name: String,
    pub version: String,
    pub summary: String,
    /// At most 500 characters, `...` appended when cut.
    pub description: String,
    pub author: String,
    pub author_email: String,
    pub maintainer: String,
    pub maintainer_email: String,
    pub license: String,
    pub home_page: String,
    pub project_urls: BTreeMap<String, String>,
    pub classifiers: Vec<String>,
    pub keywords: Vec<String>,
    pub requires_python: Option<String>,
    pub dependencies: Vec<Requirement>,
    pub extras: Vec<String>,
    pub yanked: bool,
    pub yanked_reason: Option<String>,
    pub package_url: String,
    pub project_url: String,
    pub release_url: String,
    pub version_type: VersionKind,
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileReport>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub size_formatted: String,
    /// Human-readable distribution type.
    #[serde(rename = "type")]
    pub kind: String,
    pub python_version: String,
    pub upload_time: Option<DateTime<Utc>>,
    pub yanked: bool,
}

/// Output of `get_package_versions`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionsReport {
    pub package_name: String,
    /// Releases with files, before filtering.
    pub total_versions: usize,
    pub returned_versions: usize,
    pub latest_version: Option<String>,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionEntry {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    pub is_latest: bool,
}

/// How often a project ships releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cadence {
    /// Average interval of at most 30 days.
    Fast,
    /// At most 90 days.
    Regular,
    /// At most 180 days.
    Slow,
    Stalled,
    /// A single dated release.
    InsufficientData,
    /// No dated releases at all.
    None,
}

/// Output of `get_release_activity`.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseActivityReport {
    pub package_name: String,
    pub total_releases: usize,
    /// Releases inside the requested window.
    pub recent_releases: usize,
    pub window_days: u32,
    pub first_release: Option<DateTime<Utc>>,
    pub latest_release: Option<DateTime<Utc>>,
    /// Mean whole days between consecutive releases.
    pub release_cadence_days: Option<f64>,
    pub cadence_classification: Cadence,
    /// Newest first.
    pub releases: Vec<Release>,
}

/// Output of `compare_versions`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionComparison {
    pub package_name: String,
    pub version1: VersionSummary,
    pub version2: VersionSummary,
    pub comparison: ComparisonOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionSummary {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    pub upload_time: Option<DateTime<Utc>>,
    pub dependencies_count: usize,
    pub vulnerabilities_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonOutcome {
    /// -1, 0 or 1: how the first version compares to the second.
    pub result: i8,
    /// The newer of the two, or `equal`.
    pub newer_version: String,
    pub is_upgrade: bool,
    pub is_downgrade: bool,
}

/// Output of `check_compatibility`.
#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityReport {
    pub package_name: String,
    pub package_version: String,
    pub python_version: String,
    pub is_compatible: bool,
    pub requires_python: Option<String>,
    pub compatibility_notes: Vec<String>,
    /// `Programming Language :: Python` classifiers.
    pub classifiers: Vec<String>,
}

/// Output of `get_dependencies`.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub package_name: String,
    pub package_version: String,
    pub total_dependencies: usize,
    pub runtime_dependencies: Vec<Requirement>,
    pub development_dependencies: Vec<Requirement>,
    pub available_extras: Vec<String>,
    /// Requirements keyed by the extra that pulls them in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_dependencies: Option<BTreeMap<String, Vec<Requirement>>>,
}

/// Heuristic advisory severity. `None` means there is nothing to rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityStatus {
    Secure,
    Vulnerable,
}

/// An advisory with its computed severity.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredVulnerability {
    #[serde(flatten)]
    pub advisory: Vulnerability,
    pub severity: Severity,
    pub severity_score: u8,
    pub recommendation: String,
}

/// Output of `check_vulnerabilities`.
#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityReport {
    pub package_name: String,
    pub package_version: String,
    pub vulnerability_count: usize,
    pub has_vulnerabilities: bool,
    pub vulnerabilities: Vec<ScoredVulnerability>,
    pub severity_breakdown: BTreeMap<Severity, usize>,
    pub overall_severity: Severity,
    pub overall_severity_score: u8,
    pub security_status: SecurityStatus,
    pub recommendation: String,
    /// Advisory databases that answered.
    pub sources: Vec<String>,
    /// Why the vulnerability database could not be consulted, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osv_error: Option<String>,
}

/// Output of `get_pypi_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub total_packages_size: u64,
    pub total_size_formatted: String,
    pub top_packages_count: usize,
    pub top_packages: Vec<TopPackageReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPackageReport {
    pub name: String,
    pub size: u64,
    pub size_formatted: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Output of `get_package_health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub package_name: String,
    pub package_version: String,
    /// 0 to 100.
    pub health_score: u8,
    pub health_status: HealthStatus,
    pub health_notes: Vec<String>,
    /// Points added or removed per factor.
    pub scoring_breakdown: BTreeMap<String, i32>,
    pub total_versions: usize,
    pub is_latest: bool,
    pub has_vulnerabilities: bool,
    pub is_yanked: bool,
    pub version_type: VersionKind,
    /// Release count considered, capped at 20.
    pub release_cadence: Option<usize>,
    pub latest_release_age_days: Option<i64>,
}

/// Output of `cache_info`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub cache_stats: CacheStats,
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub cache_hit_rate: f64,
    /// Keys with an upstream fetch outstanding.
    pub in_flight: usize,
    /// Requests per second allowed for each upstream.
    pub rate_limits: BTreeMap<String, u32>,
}
