//! Grouping of `Requires-Dist` entries.

use std::collections::BTreeMap;

use crate::pep440::Requirement;

const DEVELOPMENT_MARKERS: &[&str] = &["dev", "test", "lint"];

/// Requirements split by when they are installed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGroups {
    /// Unconditional, or conditional on the environment only.
    pub runtime: Vec<Requirement>,
    /// Markers mentioning dev, test or lint tooling.
    pub development: Vec<Requirement>,
    /// Pulled in by an extra, keyed by extra name.
    pub optional: BTreeMap<String, Vec<Requirement>>,
}

/// Sort requirements into runtime, development and per-extra groups.
///
/// An `extra == "..."` marker wins over development keywords, so
/// `extra == "dev"` lands under the `dev` extra.
pub fn group_dependencies(requirements: Vec<Requirement>) -> DependencyGroups {
    let mut groups = DependencyGroups::default();
    for requirement in requirements {
        if let Some(extra) = requirement.extra() {
            groups
                .optional
                .entry(extra.to_owned())
                .or_default()
                .push(requirement);
            continue;
        }
        let development = requirement
            .environment_marker
            .as_deref()
            .is_some_and(|marker| DEVELOPMENT_MARKERS.iter().any(|m| marker.contains(m)));
        if development {
            groups.development.push(requirement);
        } else {
            groups.runtime.push(requirement);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pep440::parse_requirements;

    #[test]
    fn groups_by_marker() {
        let reqs = parse_requirements([
            "charset-normalizer<4,>=2",
            "PySocks!=1.5.7,>=1.5.6; extra == \"socks\"",
            "chardet<6,>=3.0.2; extra == \"use-chardet-on-py3\"",
            "win-inet-pton; sys_platform == \"win32\" and extra == \"socks\"",
            "pytest; platform_tag == \"test\"",
            "importlib-metadata; python_version < \"3.8\"",
        ]);
        let groups = group_dependencies(reqs);

        let runtime: Vec<&str> = groups.runtime.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(runtime, ["charset-normalizer", "importlib-metadata"]);
        assert_eq!(groups.development.len(), 1);
        assert_eq!(groups.optional["socks"].len(), 2);
        assert_eq!(groups.optional["use-chardet-on-py3"].len(), 1);
    }

    #[test]
    fn dev_extra_is_optional_not_development() {
        let groups = group_dependencies(parse_requirements(["black; extra == \"dev\""]));
        assert!(groups.development.is_empty());
        assert_eq!(groups.optional["dev"][0].name, "black");
    }
}
