//! Pure computations behind the package reports.
//!
//! Nothing here touches the network or the clock; callers pass in fetched
//! records and the current time.

mod activity;
mod dependencies;
mod format;
mod security;

pub use activity::{HealthAssessment, ReleaseActivity, assess_health, health_status, release_activity};
pub use dependencies::{DependencyGroups, group_dependencies};
pub use format::{
    DESCRIPTION_LIMIT, extract_keywords, format_file_size, package_type_description,
    python_classifiers, truncate_description, validate_package_name,
};
pub use security::{
    SecurityAssessment, assess_security, classify_severity, fix_recommendation, merge_advisories,
    score_vulnerability,
};
