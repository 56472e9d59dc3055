//! Configuration loading.
//!
//! Configuration is loaded from a TOML file with the following resolution order:
//! 1. explicit path (`--config <path>`)
//! 2. `~/.pypi-gateway/config.toml` (user)
//! 3. `/etc/pypi-gateway/config.toml` (system)
//!
//! A missing file is not an error; every field has a default. `PYPI_GATEWAY_*`
//! environment variables override whatever the file says. Configuration is
//! read once at startup.
//!
//! ```toml
//! pypi_base_url = "https://pypi.org"
//! timeout_secs = 10.0
//! max_retries = 2
//! rate_limit = 5
//! cache_ttl_secs = 600
//! cache_max_size = 2000
//! ```

use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::governor::{GovernorConfig, RetryConfig};
use crate::pypi::{DEFAULT_OSV_URL, DEFAULT_PYPI_URL};
use crate::{GatewayError, Result};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "PYPI_GATEWAY_";

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package index base URL (default: https://pypi.org).
    pub pypi_base_url: String,
    /// Vulnerability database base URL (default: https://api.osv.dev).
    pub osv_base_url: String,
    /// `User-Agent` header sent upstream.
    pub user_agent: String,
    /// Per-attempt timeout in seconds (default: 30).
    pub timeout_secs: f64,
    /// Retries after the first attempt for transient failures (default: 3).
    pub max_retries: u32,
    /// Sustained requests per second, per upstream (default: 10).
    pub rate_limit: u32,
    /// Cache entry lifetime in seconds (default: 300).
    pub cache_ttl_secs: u64,
    /// Maximum cached entries (default: 1000).
    pub cache_max_size: usize,
    /// Log filter used when `RUST_LOG` is unset (default: info).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pypi_base_url: DEFAULT_PYPI_URL.to_string(),
            osv_base_url: DEFAULT_OSV_URL.to_string(),
            user_agent: crate::version::default_user_agent(),
            timeout_secs: 30.0,
            max_retries: 3,
            rate_limit: 10,
            cache_ttl_secs: 300,
            cache_max_size: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the standard locations and the process
    /// environment, then validate it.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit_path, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading overrides through `lookup`.
    pub fn load_with<F>(explicit_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_with(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GatewayError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Defaults overridden by environment variables read through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env_with(lookup)?;
        Ok(config)
    }

    /// Overwrite fields whose `PYPI_GATEWAY_*` variable is set.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (name, value))
        };

        if let Some((_, value)) = var("PYPI_BASE_URL") {
            self.pypi_base_url = value;
        }
        if let Some((_, value)) = var("OSV_BASE_URL") {
            self.osv_base_url = value;
        }
        if let Some((_, value)) = var("USER_AGENT") {
            self.user_agent = value;
        }
        if let Some((name, value)) = var("TIMEOUT") {
            self.timeout_secs = parse_number(&name, &value)?;
        }
        if let Some((name, value)) = var("MAX_RETRIES") {
            self.max_retries = parse_number(&name, &value)?;
        }
        if let Some((name, value)) = var("RATE_LIMIT") {
            self.rate_limit = parse_number(&name, &value)?;
        }
        if let Some((name, value)) = var("CACHE_TTL") {
            self.cache_ttl_secs = parse_number(&name, &value)?;
        }
        if let Some((name, value)) = var("CACHE_MAX_SIZE") {
            self.cache_max_size = parse_number(&name, &value)?;
        }
        if let Some((_, value)) = var("LOG_LEVEL") {
            self.log_level = value;
        }
        Ok(())
    }

    /// Reject values the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            return Err(invalid("timeout_secs must be a positive number of seconds"));
        }
        if self.rate_limit == 0 {
            return Err(invalid("rate_limit must be at least 1 request per second"));
        }
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs must be at least 1"));
        }
        if self.cache_max_size == 0 {
            return Err(invalid("cache_max_size must be at least 1"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent must not be empty"));
        }
        Ok(())
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| invalid("timeout_secs must be a positive number of seconds"))
    }

    /// Settings for the shared result cache.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache_max_size)
            .ttl(Duration::from_secs(self.cache_ttl_secs))
    }

    /// Settings for one upstream's governor.
    pub fn governor_config(&self) -> Result<GovernorConfig> {
        let max_rate = NonZeroU32::new(self.rate_limit)
            .ok_or_else(|| invalid("rate_limit must be at least 1 request per second"))?;
        Ok(GovernorConfig::new()
            .max_rate(max_rate)
            .attempt_timeout(self.timeout()?)
            .retry(RetryConfig::new().max_retries(self.max_retries)))
    }

    /// Find the config file to read, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GatewayError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".pypi-gateway").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/pypi-gateway/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| GatewayError::Configuration(format!("{name}: invalid number '{value}'")))
}

fn invalid(message: &str) -> GatewayError {
    GatewayError::Configuration(message.to_string())
}
