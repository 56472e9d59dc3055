//! Public types for the gateway API.

mod package;
mod report;

pub use package::{PackageFile, PackageInfo, PypiStats, Release, TopPackage, Vulnerability};
pub use report::{
    CacheInfo, Cadence, CompatibilityReport, ComparisonOutcome, DependencyReport, FileReport,
    HealthReport, HealthStatus, PackageReport, ReleaseActivityReport, ScoredVulnerability,
    SecurityStatus, Severity, StatsReport, TopPackageReport, VersionComparison, VersionEntry,
    VersionSummary, VersionsReport, VulnerabilityReport,
};
