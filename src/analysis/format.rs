//! Text helpers for reports.

/// Longest description a package report carries, in characters.
pub const DESCRIPTION_LIMIT: usize = 500;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Cut `text` to `limit` characters, appending `...` when anything was cut.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate_description(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

/// Split a free-form keywords field on commas, semicolons and whitespace,
/// lowercase it and drop common stop words.
pub fn extract_keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|word| !word.is_empty() && !STOP_WORDS.contains(word))
        .map(str::to_owned)
        .collect()
}

/// `1536` → `1.5 KB`. Units step by 1024 up to TB.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Human-readable name for a distribution type such as `bdist_wheel`.
pub fn package_type_description(packagetype: &str) -> String {
    match packagetype {
        "bdist_wheel" => "Binary wheel distribution".to_string(),
        "sdist" => "Source distribution".to_string(),
        "bdist_egg" => "Binary egg distribution (deprecated)".to_string(),
        "bdist_wininst" => "Windows installer".to_string(),
        "bdist_msi" => "Windows MSI installer".to_string(),
        "bdist_rpm" => "RPM package".to_string(),
        "bdist_dumb" => "Binary distribution".to_string(),
        other => format!("Unknown package type: {other}"),
    }
}

/// Whether `name` is a syntactically valid project name: ASCII letters,
/// digits, `.`, `_` and `-`, starting and ending with a letter or digit.
pub fn validate_package_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        }
        _ => false,
    }
}

/// Classifiers that declare Python language support.
pub fn python_classifiers(classifiers: &[String]) -> Vec<String> {
    classifiers
        .iter()
        .filter(|c| c.contains("Programming Language :: Python"))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_description("short", 500), "short");
        assert_eq!(truncate_description("abcdef", 3), "abc...");
        assert_eq!(truncate_description("ééééé", 2), "éé...");
        assert_eq!(truncate_description("abc", 3), "abc");
    }

    #[test]
    fn keywords_drop_separators_and_stop_words() {
        assert_eq!(
            extract_keywords("HTTP, client;  for the Web"),
            vec!["http", "client", "web"]
        );
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024u64.pow(5)), "3072.0 TB");
    }

    #[test]
    fn package_names() {
        for good in ["requests", "zope.interface", "typing_extensions", "a", "A1-b"] {
            assert!(validate_package_name(good), "{good}");
        }
        for bad in ["", "-leading", "trailing.", "spa ce", "semi;colon", "ünï"] {
            assert!(!validate_package_name(bad), "{bad}");
        }
    }

    #[test]
    fn package_types() {
        assert_eq!(package_type_description("sdist"), "Source distribution");
        assert_eq!(
            package_type_description("bdist_zip"),
            "Unknown package type: bdist_zip"
        );
    }
}
