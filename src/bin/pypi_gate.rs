//! pypi-gate: command-line front end for the gateway
//!
//! Runs one tool against PyPI and prints its report as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use pypi_gateway::gateway::tools::{DEFAULT_ACTIVITY_LIMIT, DEFAULT_PYTHON_VERSION, DEFAULT_WINDOW_DAYS};
use pypi_gateway::{Config, Gateway, GatewayError};
use serde::Serialize;

static LONG_VERSION: LazyLock<String> = LazyLock::new(pypi_gateway::version::version_string);

/// PyPI gateway CLI
#[derive(Parser)]
#[command(name = "pypi-gate")]
#[command(version = pypi_gateway::version::PKG_VERSION, long_version = LONG_VERSION.as_str())]
#[command(about = "Query PyPI package metadata and advisories")]
struct Args {
    /// Config file (default: ~/.pypi-gateway/config.toml, then /etc/pypi-gateway/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (overrides the config file)
    #[arg(long, global = true, env = "PYPI_GATEWAY_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Package metadata
    Info {
        package: String,
        /// Specific version (latest if omitted)
        #[arg(short, long)]
        version: Option<String>,
        /// Include distribution files
        #[arg(long)]
        files: bool,
    },

    /// Available versions, newest first
    Versions {
        package: String,
        /// Maximum versions to list
        #[arg(short, long)]
        limit: Option<usize>,
        /// Leave out pre-releases
        #[arg(long)]
        stable: bool,
    },

    /// Release cadence
    Activity {
        package: String,
        #[arg(short, long, default_value_t = DEFAULT_ACTIVITY_LIMIT)]
        limit: usize,
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_DAYS)]
        window_days: u32,
    },

    /// Compare two versions of a package
    Compare {
        package: String,
        version1: String,
        version2: String,
    },

    /// Check Requires-Python against an interpreter version
    Compat {
        package: String,
        #[arg(short, long)]
        version: Option<String>,
        #[arg(short, long, default_value = DEFAULT_PYTHON_VERSION)]
        python: String,
    },

    /// Dependencies grouped by purpose
    Deps {
        package: String,
        #[arg(short, long)]
        version: Option<String>,
        /// Include optional dependencies per extra
        #[arg(long)]
        extras: bool,
    },

    /// Known vulnerabilities
    Vulns {
        package: String,
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Index-wide statistics
    Stats,

    /// Maintenance health score
    Health {
        package: String,
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Cache statistics
    Cache,

    /// Call a tool by name with JSON arguments
    Call {
        tool: String,
        /// JSON object of arguments (default: {})
        arguments: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let gateway = match Gateway::from_config(config) {
        Ok(gateway) => gateway,
        Err(e) => return fail(&e),
    };

    match run(&gateway, args.command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

async fn run(gateway: &Gateway, command: Command) -> Result<String, GatewayError> {
    match command {
        Command::Info { package, version, files } => {
            pretty(&gateway.get_package_info(&package, version.as_deref(), files).await?)
        }
        Command::Versions { package, limit, stable } => {
            pretty(&gateway.get_package_versions(&package, limit, !stable).await?)
        }
        Command::Activity { package, limit, window_days } => {
            pretty(&gateway.get_release_activity(&package, limit, window_days).await?)
        }
        Command::Compare { package, version1, version2 } => {
            pretty(&gateway.compare_versions(&package, &version1, &version2).await?)
        }
        Command::Compat { package, version, python } => {
            pretty(&gateway.check_compatibility(&package, version.as_deref(), &python).await?)
        }
        Command::Deps { package, version, extras } => {
            pretty(&gateway.get_dependencies(&package, version.as_deref(), extras).await?)
        }
        Command::Vulns { package, version } => {
            pretty(&gateway.check_vulnerabilities(&package, version.as_deref()).await?)
        }
        Command::Stats => pretty(&gateway.get_pypi_stats().await?),
        Command::Health { package, version } => {
            pretty(&gateway.get_package_health(&package, version.as_deref()).await?)
        }
        Command::Cache => pretty(&gateway.cache_info()),
        Command::Call { tool, arguments } => {
            let arguments = match arguments {
                Some(text) => serde_json::from_str(&text).map_err(|e| {
                    GatewayError::InvalidRequest(format!("arguments are not valid JSON: {e}"))
                })?,
                None => serde_json::Value::Null,
            };
            pretty(&gateway.call_tool(&tool, arguments).await?)
        }
    }
}

fn pretty<T: Serialize>(value: &T) -> Result<String, GatewayError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn fail(err: &GatewayError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::FAILURE
}
