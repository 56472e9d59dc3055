//! Release cadence and package health scoring.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::pep440::VersionKind;
use crate::types::{Cadence, HealthStatus, PackageInfo, Release};

/// Summary of a release history.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseActivity {
    /// Dated releases, newest first.
    pub releases: Vec<Release>,
    pub recent_releases: usize,
    pub first_release: Option<DateTime<Utc>>,
    pub latest_release: Option<DateTime<Utc>>,
    pub average_interval_days: Option<f64>,
    pub cadence: Cadence,
}

/// Analyse `history` relative to `now`.
///
/// Releases without an upload time are ignored. Intervals are whole days
/// between consecutive dated releases; their mean picks the cadence.
pub fn release_activity(history: &[Release], window_days: u32, now: DateTime<Utc>) -> ReleaseActivity {
    let mut releases: Vec<Release> = history
        .iter()
        .filter(|r| r.uploaded_at.is_some())
        .cloned()
        .collect();
    releases.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

    let window_start = now - Duration::days(i64::from(window_days));
    let recent_releases = releases
        .iter()
        .filter(|r| r.uploaded_at.is_some_and(|t| t >= window_start))
        .count();

    let dates: Vec<DateTime<Utc>> = releases.iter().filter_map(|r| r.uploaded_at).collect();
    let intervals: Vec<i64> = dates
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).num_days().max(0))
        .collect();
    let average_interval_days =
        (!intervals.is_empty()).then(|| intervals.iter().sum::<i64>() as f64 / intervals.len() as f64);

    let cadence = match average_interval_days {
        _ if dates.is_empty() => Cadence::None,
        None => Cadence::InsufficientData,
        Some(avg) if avg <= 30.0 => Cadence::Fast,
        Some(avg) if avg <= 90.0 => Cadence::Regular,
        Some(avg) if avg <= 180.0 => Cadence::Slow,
        Some(_) => Cadence::Stalled,
    };

    ReleaseActivity {
        recent_releases,
        first_release: dates.last().copied(),
        latest_release: dates.first().copied(),
        average_interval_days,
        cadence,
        releases,
    }
}

/// Score breakdown for one release of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthAssessment {
    pub score: u8,
    pub status: HealthStatus,
    pub notes: Vec<String>,
    pub breakdown: BTreeMap<String, i32>,
    pub release_cadence: Option<usize>,
    pub latest_release_age_days: Option<i64>,
}

/// Running score plus the reasons for each adjustment.
struct Scorecard {
    score: i32,
    notes: Vec<String>,
    breakdown: BTreeMap<String, i32>,
}

impl Scorecard {
    fn adjust(&mut self, factor: &str, delta: i32) {
        self.score += delta;
        self.breakdown.insert(factor.to_owned(), delta);
    }

    fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// Score `info` out of 100.
///
/// `versions` is the project's release list; only its length matters.
pub fn assess_health(info: &PackageInfo, versions: &[String], now: DateTime<Utc>) -> HealthAssessment {
    let mut card = Scorecard {
        score: 100,
        notes: Vec::new(),
        breakdown: BTreeMap::new(),
    };

    let vuln_count = info.vulnerabilities.len();
    if vuln_count > 0 {
        let penalty = i32::try_from(vuln_count).unwrap_or(i32::MAX).saturating_mul(10).min(40);
        card.adjust("vulnerabilities", -penalty);
        card.note(format!("Has {vuln_count} known vulnerabilities (-{penalty})"));
    }

    if info.yanked {
        card.adjust("yanked", -40);
        card.note("Version is yanked (-40)");
    }

    if VersionKind::classify(&info.version) == VersionKind::PreRelease {
        card.adjust("pre_release", -10);
        card.note("Using pre-release version (-10)");
    }

    let mut metadata_penalty = 0;
    if info.description.is_empty() {
        metadata_penalty += 5;
        card.note("Missing description (-5)");
    }
    if info.home_page.is_empty() && info.project_urls.is_empty() {
        metadata_penalty += 5;
        card.note("Missing project URLs (-5)");
    }
    if info.license.is_empty() {
        metadata_penalty += 3;
        card.note("License information missing (-3)");
    }
    if metadata_penalty > 0 {
        card.adjust("metadata", -metadata_penalty);
    }

    let release_cadence = (!versions.is_empty()).then(|| versions.len().min(20));
    match release_cadence {
        Some(count) if count < 3 => {
            card.adjust("release_history", -10);
            card.note("Limited release history (-10)");
        }
        Some(_) => card.adjust("release_history", 5),
        None => {}
    }

    let latest_release_age_days = info.latest_upload().map(|uploaded| (now - uploaded).num_days());
    match latest_release_age_days {
        Some(days) if days > 365 => {
            card.adjust("freshness", -20);
            card.note("Last release over a year ago (-20)");
        }
        Some(days) if days > 180 => {
            card.adjust("freshness", -10);
            card.note("Last release over six months ago (-10)");
        }
        Some(_) => card.adjust("freshness", 5),
        None => {}
    }

    let score = u8::try_from(card.score.clamp(0, 100)).unwrap_or(0);
    HealthAssessment {
        score,
        status: health_status(score),
        notes: card.notes,
        breakdown: card.breakdown,
        release_cadence,
        latest_release_age_days,
    }
}

pub fn health_status(score: u8) -> HealthStatus {
    match score {
        80.. => HealthStatus::Excellent,
        60..80 => HealthStatus::Good,
        40..60 => HealthStatus::Fair,
        _ => HealthStatus::Poor,
    }
}
