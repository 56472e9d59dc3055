//! Version specifiers (`>=3.8,!=3.9.*`).

use std::fmt;
use std::str::FromStr;

use super::{ParseError, Version};

/// Comparison operator of a single specifier clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `~=`
    Compatible,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `===`
    Arbitrary,
}

impl Operator {
    // Longest first so `===` is not read as `==`.
    const ALL: [(&'static str, Operator); 8] = [
        ("===", Operator::Arbitrary),
        ("~=", Operator::Compatible),
        ("==", Operator::Equal),
        ("!=", Operator::NotEqual),
        ("<=", Operator::LessEqual),
        (">=", Operator::GreaterEqual),
        ("<", Operator::Less),
        (">", Operator::Greater),
    ];

    pub fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("", |(s, _)| *s)
    }
}

/// One clause such as `>=3.8` or `==2.*`.
#[derive(Debug, Clone)]
pub struct Specifier {
    operator: Operator,
    raw: String,
    version: Option<Version>,
    wildcard: bool,
}

impl Specifier {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let err = || ParseError::new("version specifier", input);
        let trimmed = input.trim();
        let (symbol, operator) = Operator::ALL
            .iter()
            .find(|(symbol, _)| trimmed.starts_with(symbol))
            .copied()
            .ok_or_else(err)?;
        let raw = trimmed[symbol.len()..].trim();
        if raw.is_empty() {
            return Err(err());
        }

        if operator == Operator::Arbitrary {
            return Ok(Self {
                operator,
                raw: raw.to_owned(),
                version: None,
                wildcard: false,
            });
        }

        let (body, wildcard) = match raw.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (raw, false),
        };
        if wildcard && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(err());
        }

        let version = Version::parse(body).map_err(|_| err())?;
        if wildcard && (version.is_prerelease() || version.is_postrelease() || version.has_local()) {
            return Err(err());
        }
        if operator == Operator::Compatible && (version.release().len() < 2 || version.has_local()) {
            return Err(err());
        }
        if version.has_local() && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(err());
        }

        Ok(Self {
            operator,
            raw: raw.to_owned(),
            version: Some(version),
            wildcard,
        })
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The version text after the operator, as written.
    pub fn version_text(&self) -> &str {
        &self.raw
    }

    /// Whether `candidate` satisfies this clause.
    ///
    /// Pre-releases are matched like any other version.
    pub fn contains(&self, candidate: &Version) -> bool {
        let Some(spec) = &self.version else {
            return candidate.to_string().eq_ignore_ascii_case(&self.raw);
        };
        match self.operator {
            Operator::Equal => self.matches_equal(spec, candidate),
            Operator::NotEqual => !self.matches_equal(spec, candidate),
            Operator::LessEqual => candidate.public() <= *spec,
            Operator::GreaterEqual => candidate.public() >= *spec,
            Operator::Less => {
                candidate < spec
                    && !(!spec.is_prerelease()
                        && candidate.is_prerelease()
                        && candidate.base() == spec.base())
            }
            Operator::Greater => {
                candidate > spec
                    && !(!spec.is_postrelease()
                        && candidate.is_postrelease()
                        && candidate.base() == spec.base())
                    && !(candidate.has_local() && candidate.base() == spec.base())
            }
            Operator::Compatible => {
                let prefix = &spec.release()[..spec.release().len() - 1];
                candidate.public() >= *spec && release_prefix_matches(spec.epoch(), prefix, candidate)
            }
            // `version` is None for `===`, handled above.
            Operator::Arbitrary => false,
        }
    }

    fn matches_equal(&self, spec: &Version, candidate: &Version) -> bool {
        if self.wildcard {
            release_prefix_matches(spec.epoch(), spec.release(), candidate)
        } else if spec.has_local() {
            candidate == spec
        } else {
            candidate.public() == *spec
        }
    }
}

/// `candidate` has the given epoch and its release, zero padded, starts
/// with `prefix`.
fn release_prefix_matches(epoch: u64, prefix: &[u64], candidate: &Version) -> bool {
    candidate.epoch() == epoch
        && prefix
            .iter()
            .enumerate()
            .all(|(i, n)| candidate.release().get(i).copied().unwrap_or(0) == *n)
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.as_str(), self.raw)
    }
}

/// Comma-separated specifier clauses, all of which must hold.
///
/// An empty set matches every version.
///
/// ```rust
/// # use pypi_gateway::pep440::{SpecifierSet, Version};
/// let spec = SpecifierSet::parse(">=3.8, !=3.9.*").unwrap();
/// assert!(spec.contains(&Version::parse("3.11").unwrap()));
/// assert!(!spec.contains(&Version::parse("3.9.2").unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpecifierSet {
    specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let specifiers = input
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(Specifier::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { specifiers })
    }

    pub fn is_empty(&self) -> bool {
        self.specifiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Specifier> {
        self.specifiers.iter()
    }

    pub fn contains(&self, candidate: &Version) -> bool {
        self.specifiers.iter().all(|s| s.contains(candidate))
    }
}

impl FromStr for SpecifierSet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Clauses sorted and joined by commas, without spaces.
impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clauses: Vec<String> = self.specifiers.iter().map(ToString::to_string).collect();
        clauses.sort();
        f.write_str(&clauses.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(spec: &str, version: &str) -> bool {
        SpecifierSet::parse(spec)
            .unwrap()
            .contains(&Version::parse(version).unwrap())
    }

    #[test]
    fn simple_comparisons() {
        assert!(matches(">=3.8", "3.8"));
        assert!(matches(">=3.8", "3.11"));
        assert!(!matches(">=3.8", "3.7.9"));
        assert!(matches("<4", "3.99"));
        assert!(matches("<=3.8", "3.8.0"));
        assert!(matches(">3.8", "3.8.1"));
        assert!(!matches(">3.8", "3.8"));
    }

    #[test]
    fn equality_and_wildcards() {
        assert!(matches("==3.8", "3.8.0"));
        assert!(matches("==3.8.*", "3.8.12"));
        assert!(!matches("==3.8.*", "3.9"));
        assert!(!matches("!=3.9.*", "3.9.1"));
        assert!(matches("!=3.9.*", "3.10"));
        assert!(matches("==1.0", "1.0+local.1"));
        assert!(!matches("==1.0+a", "1.0+b"));
    }

    #[test]
    fn compatible_release() {
        assert!(matches("~=2.2", "2.3"));
        assert!(!matches("~=2.2", "3.0"));
        assert!(matches("~=1.4.5", "1.4.9"));
        assert!(!matches("~=1.4.5", "1.5.0"));
        assert!(!matches("~=1.4.5", "1.4.4"));
    }

    #[test]
    fn exclusive_bounds_skip_own_pre_and_post_releases() {
        assert!(!matches("<3.0", "3.0.dev1"));
        assert!(matches("<3.0rc1", "3.0b1"));
        assert!(!matches(">1.7", "1.7.post2"));
        assert!(matches(">1.7.post2", "1.7.post3"));
    }

    #[test]
    fn multiple_clauses_all_apply() {
        assert!(matches(">=3.7, <3.12, !=3.9.*", "3.11.4"));
        assert!(!matches(">=3.7, <3.12, !=3.9.*", "3.9.0"));
        assert!(!matches(">=3.7, <3.12, !=3.9.*", "3.12"));
    }

    #[test]
    fn empty_set_matches_everything() {
        assert!(matches("", "0.0.1"));
        assert!(matches(" , ", "99"));
    }

    #[test]
    fn arbitrary_equality_is_textual() {
        assert!(matches("===1.0", "1.0"));
        assert!(!matches("===1.0", "1.0.0"));
    }

    #[test]
    fn rejects_malformed_clauses() {
        for bad in [">=", "3.8", "~=1", ">=3.*", "=>3.8", "==3.8.*.1"] {
            assert!(SpecifierSet::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn displays_sorted_without_spaces() {
        let spec = SpecifierSet::parse("<3, >=2.0").unwrap();
        assert_eq!(spec.to_string(), "<3,>=2.0");
    }
}
