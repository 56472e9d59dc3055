//! Version parsing and ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::ParseError;

/// Pre-release phase. Declaration order is the sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreTag {
    Alpha,
    Beta,
    Rc,
}

impl PreTag {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "a" | "alpha" => Some(Self::Alpha),
            "b" | "beta" => Some(Self::Beta),
            "rc" | "c" | "pre" | "preview" => Some(Self::Rc),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Rc => "rc",
        }
    }
}

/// One dot-separated part of a local version label.
///
/// Numeric parts sort above alphanumeric ones; the derive relies on the
/// variant order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocalSegment {
    Text(String),
    Number(u64),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A parsed PEP 440 version.
///
/// Equality and ordering follow PEP 440, so `1.0` equals `1.0.0` and
/// `1.0.dev1 < 1.0a1 < 1.0 < 1.0.post1`.
///
/// ```rust
/// # use pypi_gateway::pep440::Version;
/// let a: Version = "1.0rc1".parse().unwrap();
/// let b: Version = "1.0".parse().unwrap();
/// assert!(a < b);
/// assert!(a.is_prerelease());
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreTag, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

impl Version {
    /// Parse a version string, accepting the alternate spellings PEP 440
    /// normalizes (`v1.0`, `1.0-alpha.1`, `1.0-1`, `1.0_dev`...).
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let lowered = input.trim().to_ascii_lowercase();
        let err = || ParseError::new("version", input);
        let mut c = Cursor::new(&lowered);

        c.eat('v');
        let first = c.number().ok_or_else(err)?;
        let (epoch, leading) = if c.eat('!') {
            (first, c.number().ok_or_else(err)?)
        } else {
            (0, first)
        };

        let mut release = vec![leading];
        loop {
            let mark = c.pos;
            if c.eat('.') {
                if let Some(n) = c.number() {
                    release.push(n);
                    continue;
                }
            }
            c.pos = mark;
            break;
        }

        let pre = {
            let mark = c.pos;
            c.eat_separator();
            match c.word(&["alpha", "beta", "preview", "pre", "rc", "a", "b", "c"]) {
                Some(word) => PreTag::from_word(word).map(|tag| (tag, c.implicit_number())),
                None => {
                    c.pos = mark;
                    None
                }
            }
        };

        let post = {
            let mark = c.pos;
            let implicit = if c.eat('-') { c.number() } else { None };
            if implicit.is_some() {
                implicit
            } else {
                c.pos = mark;
                c.eat_separator();
                if c.word(&["post", "rev", "r"]).is_some() {
                    Some(c.implicit_number())
                } else {
                    c.pos = mark;
                    None
                }
            }
        };

        let dev = {
            let mark = c.pos;
            c.eat_separator();
            if c.word(&["dev"]).is_some() {
                Some(c.implicit_number())
            } else {
                c.pos = mark;
                None
            }
        };

        let local = if c.eat('+') {
            let label = c.rest();
            c.pos = lowered.len();
            parse_local(label).ok_or_else(err)?
        } else {
            Vec::new()
        };

        if !c.at_end() {
            return Err(err());
        }

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    /// The epoch (`N!`), 0 when absent.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Release components, e.g. `[1, 2, 0]` for `1.2.0`.
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Pre-release phase and number.
    pub fn pre(&self) -> Option<(PreTag, u64)> {
        self.pre
    }

    /// Pre-release or development release.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn is_devrelease(&self) -> bool {
        self.dev.is_some()
    }

    pub fn has_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// Stable or pre-release.
    pub fn kind(&self) -> VersionKind {
        if self.is_prerelease() {
            VersionKind::PreRelease
        } else {
            VersionKind::Stable
        }
    }

    /// The version without its local label.
    pub fn public(&self) -> Self {
        Self {
            local: Vec::new(),
            ..self.clone()
        }
    }

    /// Epoch and release only.
    pub fn base(&self) -> Self {
        Self {
            epoch: self.epoch,
            release: self.release.clone(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    fn trimmed_release(&self) -> &[u64] {
        let end = self
            .release
            .iter()
            .rposition(|&n| n != 0)
            .map_or(0, |i| i + 1);
        &self.release[..end]
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (Some((tag, n)), _, _) => PreKey::Pre(tag, n),
            (None, None, Some(_)) => PreKey::DevOnly,
            (None, _, _) => PreKey::Final,
        }
    }

    fn dev_key(&self) -> (bool, u64) {
        (self.dev.is_none(), self.dev.unwrap_or(0))
    }
}

/// Where the pre-release part places a version among its siblings.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreTag, u64),
    Final,
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.trimmed_release().cmp(other.trimmed_release()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Normalized form: `1!2.0rc1.post2.dev3+ubuntu.1`.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        f.write_str(&release.join("."))?;
        if let Some((tag, n)) = self.pre {
            write!(f, "{}{n}", tag.as_str())?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if !self.local.is_empty() {
            let local: Vec<String> = self.local.iter().map(ToString::to_string).collect();
            write!(f, "+{}", local.join("."))?;
        }
        Ok(())
    }
}

/// Release stability, as reported by the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionKind {
    Stable,
    /// Alpha, beta, release candidate or development release.
    PreRelease,
}

impl VersionKind {
    /// Classify a version string.
    ///
    /// Strings that are not valid PEP 440 versions are pre-releases when
    /// they mention a pre-release marker, stable otherwise.
    pub fn classify(version: &str) -> Self {
        match Version::parse(version) {
            Ok(v) => v.kind(),
            Err(_) => {
                let lowered = version.to_ascii_lowercase();
                if ["alpha", "beta", "rc", "dev", "pre"]
                    .iter()
                    .any(|marker| lowered.contains(marker))
                {
                    Self::PreRelease
                } else {
                    Self::Stable
                }
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::PreRelease => "pre-release",
        }
    }
}

fn parse_local(label: &str) -> Option<Vec<LocalSegment>> {
    label
        .split(['.', '-', '_'])
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_alphanumeric()) {
                None
            } else if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().ok().map(LocalSegment::Number)
            } else {
                Some(LocalSegment::Text(part.to_owned()))
            }
        })
        .collect()
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_separator(&mut self) -> bool {
        self.eat('.') || self.eat('-') || self.eat('_')
    }

    fn number(&mut self) -> Option<u64> {
        let digits = self
            .rest()
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if digits == 0 {
            return None;
        }
        let value = self.rest()[..digits].parse().ok()?;
        self.pos += digits;
        Some(value)
    }

    /// `[-_.]?N?`, where a missing number means 0.
    fn implicit_number(&mut self) -> u64 {
        let mark = self.pos;
        self.eat_separator();
        match self.number() {
            Some(n) => n,
            None => {
                self.pos = mark;
                0
            }
        }
    }

    /// Consume the first of `words` the input continues with.
    fn word(&mut self, words: &[&'static str]) -> Option<&'static str> {
        let found = words.iter().find(|w| self.rest().starts_with(**w))?;
        self.pos += found.len();
        Some(*found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parses_every_segment() {
        let version = v("2!1.2.3rc4.post5.dev6+ubuntu.7");
        assert_eq!(version.epoch(), 2);
        assert_eq!(version.release(), &[1, 2, 3]);
        assert_eq!(version.pre(), Some((PreTag::Rc, 4)));
        assert!(version.is_postrelease());
        assert!(version.is_devrelease());
        assert!(version.has_local());
        assert_eq!(version.to_string(), "2!1.2.3rc4.post5.dev6+ubuntu.7");
    }

    #[test]
    fn normalizes_alternate_spellings() {
        assert_eq!(v("V1.0-Alpha.1").to_string(), "1.0a1");
        assert_eq!(v("1.0c2").to_string(), "1.0rc2");
        assert_eq!(v("1.0-1").to_string(), "1.0.post1");
        assert_eq!(v("1.0_rev").to_string(), "1.0.post0");
        assert_eq!(v("1.0dev").to_string(), "1.0.dev0");
        assert_eq!(v(" 1.0 ").to_string(), "1.0");
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "abc", "1.0-foo", "1..0", "1.0+", "1.0+a..b", "1.0 beta 2"] {
            assert!(Version::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn orders_per_pep440() {
        let ordered = [
            "1.0.dev456",
            "1.0a1",
            "1.0a2.dev456",
            "1.0a12",
            "1.0b1.dev456",
            "1.0b2",
            "1.0b2.post345.dev456",
            "1.0b2.post345",
            "1.0rc1.dev456",
            "1.0rc1",
            "1.0",
            "1.0+abc.5",
            "1.0+abc.7",
            "1.0+5",
            "1.0.post456.dev34",
            "1.0.post456",
            "1.1.dev1",
            "1!0.1",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn trailing_zeros_are_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert!(v("1.0") < v("1.0.1"));
    }

    #[test]
    fn classifies_kinds() {
        assert_eq!(VersionKind::classify("2.31.0"), VersionKind::Stable);
        assert_eq!(VersionKind::classify("3.0.0b1"), VersionKind::PreRelease);
        assert_eq!(VersionKind::classify("1.0.dev3"), VersionKind::PreRelease);
        assert_eq!(VersionKind::classify("1.0.post1"), VersionKind::Stable);
        assert_eq!(VersionKind::classify("nightly-beta"), VersionKind::PreRelease);
        assert_eq!(VersionKind::classify("whatever"), VersionKind::Stable);
    }
}
