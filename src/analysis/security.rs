//! Advisory scoring and merging.

use std::collections::{BTreeMap, HashSet};

use crate::types::{ScoredVulnerability, SecurityStatus, Severity, Vulnerability};

const BASE_SCORE: u8 = 40;
const CVE_ALIAS_SCORE: u8 = 75;
const NO_FIX_SCORE: u8 = 80;

// Matched as substrings of the lowercased summary and details.
const KEYWORD_SCORES: &[(&str, u8)] = &[
    ("critical", 90),
    ("severe", 80),
    ("high", 75),
    ("important", 70),
    ("medium", 55),
    ("low", 40),
];

/// Heuristic 0-100 severity score for an advisory.
///
/// Starts at 40 and takes the highest of: a CVE alias (75), severity
/// keywords in the text, and the absence of any fixed version (80).
pub fn score_vulnerability(vuln: &Vulnerability) -> u8 {
    let mut score = BASE_SCORE;
    if vuln.aliases.iter().any(|alias| alias.starts_with("CVE-")) {
        score = score.max(CVE_ALIAS_SCORE);
    }
    let text = format!("{} {}", vuln.summary, vuln.details).to_lowercase();
    for (keyword, keyword_score) in KEYWORD_SCORES {
        if text.contains(keyword) {
            score = score.max(*keyword_score);
        }
    }
    if vuln.fixed_in.is_empty() {
        score = score.max(NO_FIX_SCORE);
    }
    score
}

pub fn classify_severity(score: u8) -> Severity {
    match score {
        85.. => Severity::Critical,
        70..85 => Severity::High,
        50..70 => Severity::Medium,
        35..50 => Severity::Low,
        _ => Severity::Info,
    }
}

/// What to do about one advisory.
pub fn fix_recommendation(vuln: &Vulnerability) -> String {
    if vuln.fixed_in.is_empty() {
        "Monitor for fixes; no patched versions listed".to_string()
    } else {
        format!("Update to one of: {}", vuln.fixed_in.join(", "))
    }
}

/// Append `extra` advisories to `primary`, skipping any whose id or
/// aliases match an advisory already present.
pub fn merge_advisories(primary: Vec<Vulnerability>, extra: Vec<Vulnerability>) -> Vec<Vulnerability> {
    let mut seen: HashSet<String> = primary
        .iter()
        .flat_map(|v| std::iter::once(v.id.clone()).chain(v.aliases.iter().cloned()))
        .collect();
    let mut merged = primary;
    for vuln in extra {
        let duplicate = seen.contains(&vuln.id) || vuln.aliases.iter().any(|a| seen.contains(a));
        if duplicate {
            continue;
        }
        seen.insert(vuln.id.clone());
        seen.extend(vuln.aliases.iter().cloned());
        merged.push(vuln);
    }
    merged
}

/// Scored advisories plus the roll-up a vulnerability report needs.
#[derive(Debug, Clone)]
pub struct SecurityAssessment {
    pub vulnerabilities: Vec<ScoredVulnerability>,
    pub severity_breakdown: BTreeMap<Severity, usize>,
    pub overall_severity: Severity,
    pub overall_score: u8,
    pub status: SecurityStatus,
    pub recommendation: String,
}

pub fn assess_security(advisories: Vec<Vulnerability>) -> SecurityAssessment {
    let mut breakdown = BTreeMap::new();
    let mut highest = 0u8;
    let vulnerabilities: Vec<ScoredVulnerability> = advisories
        .into_iter()
        .map(|advisory| {
            let score = score_vulnerability(&advisory);
            let severity = classify_severity(score);
            *breakdown.entry(severity).or_insert(0) += 1;
            highest = highest.max(score);
            ScoredVulnerability {
                recommendation: fix_recommendation(&advisory),
                advisory,
                severity,
                severity_score: score,
            }
        })
        .collect();

    if vulnerabilities.is_empty() {
        return SecurityAssessment {
            vulnerabilities,
            severity_breakdown: breakdown,
            overall_severity: Severity::None,
            overall_score: 0,
            status: SecurityStatus::Secure,
            recommendation: "No known vulnerabilities".to_string(),
        };
    }

    SecurityAssessment {
        vulnerabilities,
        severity_breakdown: breakdown,
        overall_severity: classify_severity(highest),
        overall_score: highest,
        status: SecurityStatus::Vulnerable,
        recommendation: "Address the listed vulnerabilities".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisory(id: &str) -> Vulnerability {
        Vulnerability {
            id: id.to_string(),
            source: "osv".to_string(),
            fixed_in: vec!["2.0".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn base_score_for_plain_fixed_advisory() {
        assert_eq!(score_vulnerability(&advisory("X")), 40);
    }

    #[test]
    fn cve_alias_raises_score() {
        let vuln = Vulnerability {
            aliases: vec!["CVE-2024-1".to_string()],
            ..advisory("X")
        };
        assert_eq!(score_vulnerability(&vuln), 75);
    }

    #[test]
    fn keywords_take_the_maximum() {
        let vuln = Vulnerability {
            summary: "Low impact".to_string(),
            details: "but CRITICAL in some setups".to_string(),
            ..advisory("X")
        };
        assert_eq!(score_vulnerability(&vuln), 90);
    }

    #[test]
    fn missing_fix_scores_high() {
        let vuln = Vulnerability {
            fixed_in: vec![],
            ..advisory("X")
        };
        assert_eq!(score_vulnerability(&vuln), 80);
        assert_eq!(
            fix_recommendation(&vuln),
            "Monitor for fixes; no patched versions listed"
        );
    }

    #[test]
    fn severity_thresholds() {
        assert_eq!(classify_severity(85), Severity::Critical);
        assert_eq!(classify_severity(84), Severity::High);
        assert_eq!(classify_severity(70), Severity::High);
        assert_eq!(classify_severity(50), Severity::Medium);
        assert_eq!(classify_severity(35), Severity::Low);
        assert_eq!(classify_severity(34), Severity::Info);
    }

    #[test]
    fn merge_skips_ids_and_aliases_already_present() {
        let pysec = Vulnerability {
            aliases: vec!["CVE-1".to_string()],
            ..advisory("PYSEC-1")
        };
        let ghsa = Vulnerability {
            aliases: vec!["PYSEC-1".to_string()],
            ..advisory("GHSA-1")
        };
        let merged = merge_advisories(vec![pysec], vec![ghsa, advisory("PYSEC-1"), advisory("GHSA-2")]);
        let ids: Vec<&str> = merged.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["PYSEC-1", "GHSA-2"]);
    }

    #[test]
    fn empty_assessment_is_secure() {
        let assessment = assess_security(vec![]);
        assert_eq!(assessment.overall_severity, Severity::None);
        assert_eq!(assessment.status, SecurityStatus::Secure);
    }

    #[test]
    fn assessment_rolls_up_highest() {
        let assessment = assess_security(vec![
            advisory("A"),
            Vulnerability {
                fixed_in: vec![],
                ..advisory("B")
            },
        ]);
        assert_eq!(assessment.overall_score, 80);
        assert_eq!(assessment.overall_severity, Severity::High);
        assert_eq!(assessment.severity_breakdown[&Severity::Low], 1);
        assert_eq!(assessment.severity_breakdown[&Severity::High], 1);
        assert_eq!(assessment.vulnerabilities[0].recommendation, "Update to one of: 2.0");
    }
}
