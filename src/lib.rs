//! pypi-gateway - cached, rate-governed access to PyPI metadata
//!
//! This crate answers package questions (metadata, versions, dependencies,
//! compatibility, vulnerabilities, health) from the public PyPI JSON API and
//! the OSV vulnerability database. Every upstream call goes through the same
//! machinery:
//!
//! - a process-wide [`ResultCache`] (LRU + TTL, with hit/miss statistics),
//! - a per-upstream [`Governor`](governor::Governor) (rolling one-second
//!   rate limit, bounded retry with backoff on transient failures),
//! - a single-flight [`Fetcher`](fetch::Fetcher), so concurrent requests for
//!   the same data share one upstream fetch.
//!
//! # Example
//!
//! ```rust,no_run
//! use pypi_gateway::{Config, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> pypi_gateway::Result<()> {
//!     let gateway = Gateway::from_config(Config::load(None)?)?;
//!
//!     let report = gateway.check_vulnerabilities("jinja2", Some("2.10")).await?;
//!     println!("{} advisories, overall {:?}", report.vulnerability_count, report.overall_severity);
//!
//!     let stats = gateway.cache_info();
//!     println!("cache hit rate: {:.2}", stats.cache_hit_rate);
//!     Ok(())
//! }
//! ```
//!
//! # Tool dispatch
//!
//! A tool-calling front end can forward raw JSON arguments:
//!
//! ```rust,no_run
//! # async fn run(gateway: pypi_gateway::Gateway) -> pypi_gateway::Result<()> {
//! let result = gateway
//!     .call_tool("get_package_versions", serde_json::json!({"package_name": "flask", "limit": 5}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod governor;
pub mod pep440;
pub mod pypi;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheKey, CacheStats, ResultCache};
pub use config::Config;
pub use error::{ErrorKind, GatewayError, Result};
pub use fetch::{FetchRequest, Fetcher, Upstream};
pub use gateway::{Gateway, GatewayBuilder};
pub use governor::{GovernorConfig, RetryConfig};
pub use pypi::Payload;
