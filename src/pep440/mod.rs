//! PEP 440 versions and specifiers, and PEP 508 requirement strings.
//!
//! Covers what package reports need: ordering release lists, classifying
//! pre-releases, checking `Requires-Python` and splitting `Requires-Dist`
//! entries. Environment markers are kept as text and never evaluated.

mod requirement;
mod specifier;
mod version;

pub use requirement::{Requirement, parse_requirements};
pub use specifier::{Operator, Specifier, SpecifierSet};
pub use version::{PreTag, Version, VersionKind};

use std::cmp::{Ordering, Reverse};

use crate::GatewayError;

/// Input that is not valid PEP 440 / PEP 508 syntax.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {what}: '{input}'")]
pub struct ParseError {
    what: &'static str,
    input: String,
}

impl ParseError {
    pub(crate) fn new(what: &'static str, input: &str) -> Self {
        Self {
            what,
            input: input.to_owned(),
        }
    }
}

impl From<ParseError> for GatewayError {
    fn from(err: ParseError) -> Self {
        GatewayError::InvalidRequest(err.to_string())
    }
}

/// Compare two version strings, falling back to plain string order when
/// either one is not a valid version.
pub fn compare_version_strings(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Sort version strings newest first. Strings that are not valid versions
/// go last, in reverse string order.
pub fn sort_newest_first(versions: &mut [String]) {
    versions.sort_by_cached_key(|v| Reverse((Version::parse(v).ok(), v.clone())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_parsed_before_textual() {
        assert_eq!(compare_version_strings("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_version_strings("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_version_strings("abc", "abd"), Ordering::Less);
    }

    #[test]
    fn sorts_newest_first() {
        let mut versions: Vec<String> = ["1.0", "nightly", "2.0b1", "1.10", "2.0"]
            .into_iter()
            .map(String::from)
            .collect();
        sort_newest_first(&mut versions);
        assert_eq!(versions, ["2.0", "2.0b1", "1.10", "1.0", "nightly"]);
    }

    #[test]
    fn parse_errors_become_invalid_request() {
        let err: GatewayError = Version::parse("not a version").unwrap_err().into();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidRequest);
    }
}
