//! Version information with embedded git metadata.
//!
//! `build.rs` asks vergen for the branch, commit and dirty flag only. Builds
//! outside a git checkout fall back to "unknown".

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git branch at build time, or "unknown" if unavailable.
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Git commit SHA at build time, or "unknown" if unavailable.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Whether the working tree was dirty at build time.
pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// Build identity shown by `pypi-gate --version` and logged when a gateway
/// starts, such as `0.1.0+main.3f9c2ab` or `0.1.0+main.3f9c2ab.dirty`.
///
/// The `User-Agent` sent upstream carries only [`PKG_VERSION`], so cache
/// operators see one agent per release rather than one per commit.
pub fn version_string() -> String {
    let dirty_suffix = if git_dirty() { ".dirty" } else { "" };
    format!(
        "{PKG_VERSION}+{GIT_BRANCH}.{}{dirty_suffix}",
        &GIT_SHA[..7.min(GIT_SHA.len())]
    )
}

/// Default `User-Agent` sent to upstream APIs.
pub fn default_user_agent() -> String {
    format!("pypi-gateway/{PKG_VERSION}")
}
