//! Dependency requirement strings (`requests[socks]>=2.0; python_version < "3.8"`).

use serde::Serialize;

use super::{ParseError, SpecifierSet};
use crate::fetch::normalize_package_name;

/// A parsed `Requires-Dist` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: String,
    /// Normalized specifier, empty when unconstrained.
    pub version_spec: String,
    pub extras: Vec<String>,
    /// Everything after `;`, trimmed.
    pub environment_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Requirement {
    /// Strict parse.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let err = || ParseError::new("requirement", input);

        let (spec_part, marker) = match input.split_once(';') {
            Some((head, marker)) => {
                let marker = marker.trim();
                (head, (!marker.is_empty()).then(|| marker.to_owned()))
            }
            None => (input, None),
        };

        let spec_part = spec_part.trim();
        let name_len = spec_part
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(spec_part.len());
        let name = &spec_part[..name_len];
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric())
            || !name.ends_with(|c: char| c.is_ascii_alphanumeric())
        {
            return Err(err());
        }

        let mut rest = spec_part[name_len..].trim_start();
        let mut extras = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let (list, tail) = after.split_once(']').ok_or_else(err)?;
            for extra in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                if !extra.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
                    return Err(err());
                }
                extras.push(extra.to_owned());
            }
            rest = tail.trim_start();
        }

        let mut url = None;
        let mut version_spec = String::new();
        if let Some(location) = rest.strip_prefix('@') {
            let location = location.trim();
            if location.is_empty() {
                return Err(err());
            }
            url = Some(location.to_owned());
        } else {
            let clauses = match rest.strip_prefix('(') {
                Some(inner) => inner.strip_suffix(')').ok_or_else(err)?,
                None => rest,
            };
            if !clauses.trim().is_empty() {
                version_spec = SpecifierSet::parse(clauses).map_err(|_| err())?.to_string();
            }
        }

        Ok(Self {
            name: name.to_owned(),
            version_spec,
            extras,
            environment_marker: marker,
            url,
        })
    }

    /// Parse, degrading to a bare normalized name when the string is
    /// malformed. Never fails.
    pub fn parse_lenient(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|_| Self {
            name: normalize_package_name(input.split_whitespace().next().unwrap_or(input)),
            version_spec: String::new(),
            extras: Vec::new(),
            environment_marker: None,
            url: None,
        })
    }

    /// The extra this requirement belongs to, from an `extra == "name"`
    /// marker clause.
    pub fn extra(&self) -> Option<&str> {
        let marker = self.environment_marker.as_deref()?;
        let start = marker.find("extra")? + "extra".len();
        let value = marker[start..].trim_start().strip_prefix("==")?.trim_start();
        let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let body = &value[1..];
        body.find(quote).map(|end| &body[..end])
    }
}

/// Parse every non-blank entry leniently.
pub fn parse_requirements<'a>(entries: impl IntoIterator<Item = &'a str>) -> Vec<Requirement> {
    entries
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(Requirement::parse_lenient)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_requirement() {
        let req = Requirement::parse("requests[socks, security] >=2.0,<3 ; extra == \"net\"").unwrap();
        assert_eq!(req.name, "requests");
        assert_eq!(req.extras, vec!["socks", "security"]);
        assert_eq!(req.version_spec, "<3,>=2.0");
        assert_eq!(req.environment_marker.as_deref(), Some("extra == \"net\""));
        assert_eq!(req.extra(), Some("net"));
    }

    #[test]
    fn parenthesized_specifier() {
        let req = Requirement::parse("six (>=1.5)").unwrap();
        assert_eq!(req.version_spec, ">=1.5");
        assert!(req.extra().is_none());
    }

    #[test]
    fn url_requirement() {
        let req = Requirement::parse("pip @ https://github.com/pypa/pip/archive/1.3.1.zip").unwrap();
        assert_eq!(req.url.as_deref(), Some("https://github.com/pypa/pip/archive/1.3.1.zip"));
        assert_eq!(req.version_spec, "");
    }

    #[test]
    fn single_quoted_extra() {
        let req = Requirement::parse("pytest; extra=='test'").unwrap();
        assert_eq!(req.extra(), Some("test"));
    }

    #[test]
    fn malformed_falls_back_to_name() {
        let req = Requirement::parse_lenient("Weird_Name >>> nonsense");
        assert_eq!(req.name, "weird-name");
        assert!(req.version_spec.is_empty());
        assert!(req.environment_marker.is_none());
    }

    #[test]
    fn blank_entries_are_skipped() {
        let reqs = parse_requirements(["flask", "  ", "click>=8"]);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].version_spec, ">=8");
    }
}
