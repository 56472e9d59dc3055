//! JSON tool dispatch.
//!
//! [`Gateway::call_tool`] takes a tool name and a JSON object of arguments,
//! as a tool-calling protocol layer would hand them over, and returns the
//! tool's report as JSON.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Gateway;
use super::tools::{DEFAULT_ACTIVITY_LIMIT, DEFAULT_PYTHON_VERSION, DEFAULT_WINDOW_DAYS};
use crate::{GatewayError, Result};

/// Every tool name [`Gateway::call_tool`] understands.
pub const TOOL_NAMES: &[&str] = &[
    "get_package_info",
    "get_package_versions",
    "get_release_activity",
    "compare_versions",
    "check_compatibility",
    "get_dependencies",
    "check_vulnerabilities",
    "get_pypi_stats",
    "get_package_health",
    "get_cache_info",
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageArgs {
    package_name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageInfoArgs {
    package_name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    include_files: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VersionsArgs {
    package_name: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default = "default_true")]
    include_prereleases: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActivityArgs {
    package_name: String,
    #[serde(default = "default_activity_limit")]
    limit: usize,
    #[serde(default = "default_window_days")]
    window_days: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompareArgs {
    package_name: String,
    version1: String,
    version2: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompatibilityArgs {
    package_name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default = "default_python_version")]
    python_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DependencyArgs {
    package_name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    include_extras: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

fn default_true() -> bool {
    true
}

fn default_activity_limit() -> usize {
    DEFAULT_ACTIVITY_LIMIT
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

fn default_python_version() -> String {
    DEFAULT_PYTHON_VERSION.to_string()
}

impl Gateway {
    /// Run the tool called `name` with JSON `arguments`.
    ///
    /// `null` arguments are treated as an empty object. Unknown tools,
    /// unknown argument names and ill-typed arguments are
    /// [`GatewayError::InvalidRequest`].
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        match name {
            "get_package_info" => {
                let args: PackageInfoArgs = parse_args(name, arguments)?;
                to_json(
                    self.get_package_info(&args.package_name, args.version.as_deref(), args.include_files)
                        .await?,
                )
            }
            "get_package_versions" => {
                let args: VersionsArgs = parse_args(name, arguments)?;
                to_json(
                    self.get_package_versions(&args.package_name, args.limit, args.include_prereleases)
                        .await?,
                )
            }
            "get_release_activity" => {
                let args: ActivityArgs = parse_args(name, arguments)?;
                to_json(
                    self.get_release_activity(&args.package_name, args.limit, args.window_days)
                        .await?,
                )
            }
            "compare_versions" => {
                let args: CompareArgs = parse_args(name, arguments)?;
                to_json(
                    self.compare_versions(&args.package_name, &args.version1, &args.version2)
                        .await?,
                )
            }
            "check_compatibility" => {
                let args: CompatibilityArgs = parse_args(name, arguments)?;
                to_json(
                    self.check_compatibility(&args.package_name, args.version.as_deref(), &args.python_version)
                        .await?,
                )
            }
            "get_dependencies" => {
                let args: DependencyArgs = parse_args(name, arguments)?;
                to_json(
                    self.get_dependencies(&args.package_name, args.version.as_deref(), args.include_extras)
                        .await?,
                )
            }
            "check_vulnerabilities" => {
                let args: PackageArgs = parse_args(name, arguments)?;
                to_json(
                    self.check_vulnerabilities(&args.package_name, args.version.as_deref())
                        .await?,
                )
            }
            "get_pypi_stats" => {
                let NoArgs {} = parse_args(name, arguments)?;
                to_json(self.get_pypi_stats().await?)
            }
            "get_package_health" => {
                let args: PackageArgs = parse_args(name, arguments)?;
                to_json(
                    self.get_package_health(&args.package_name, args.version.as_deref())
                        .await?,
                )
            }
            "get_cache_info" => {
                let NoArgs {} = parse_args(name, arguments)?;
                to_json(self.cache_info())
            }
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown tool '{other}'"
            ))),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| GatewayError::InvalidRequest(format!("{tool}: {e}")))
}

fn to_json<T: serde::Serialize>(report: T) -> Result<Value> {
    serde_json::to_value(report)
        .map_err(|e| GatewayError::Internal(format!("failed to encode tool result: {e}")))
}
