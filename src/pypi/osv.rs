//! Client for the OSV vulnerability database.
//!
//! See: <https://google.github.io/osv.dev/post-v1-query/>

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::Payload;
use super::http::{HttpClient, join_path, parse_base_url};
use super::wire::{OsvPackage, OsvQuery, OsvResponse};
use crate::fetch::{FetchRequest, Upstream, ops};
use crate::types::Vulnerability;
use crate::{GatewayError, Result};

/// Default base URL for the vulnerability database.
pub const DEFAULT_OSV_URL: &str = "https://api.osv.dev";

/// Pages followed for a single query before giving up on the rest.
const MAX_PAGES: usize = 10;

/// The vulnerability database upstream. Handles `vulnerabilities`.
#[derive(Debug, Clone)]
pub struct OsvDatabase {
    http: HttpClient,
    base_url: Url,
}

impl OsvDatabase {
    pub const NAME: &'static str = "osv";

    pub fn new(http: HttpClient, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Advisories affecting `name`, or only `version` of it.
    ///
    /// Unknown packages simply have no advisories.
    pub async fn vulnerabilities(&self, name: &str, version: Option<&str>) -> Result<Vec<Vulnerability>> {
        let url = join_path(&self.base_url, &["v1", "query"])?;
        let context = FetchRequest::vulnerabilities(name, version).describe();
        let mut advisories = Vec::new();
        let mut page_token = None;

        for _ in 0..MAX_PAGES {
            let query = OsvQuery {
                package: OsvPackage {
                    name,
                    ecosystem: "PyPI",
                },
                version,
                page_token: page_token.take(),
            };
            let response: OsvResponse = self
                .http
                .post_json(&context, url.clone(), &query, || {
                    "OSV query endpoint not found".to_string()
                })
                .await?;

            advisories.extend(
                response
                    .vulns
                    .unwrap_or_default()
                    .into_iter()
                    .map(|v| v.into_vulnerability()),
            );
            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(advisories),
            }
        }

        debug!(package = name, pages = MAX_PAGES, "stopped following OSV result pages");
        Ok(advisories)
    }
}

#[async_trait]
impl Upstream for OsvDatabase {
    type Value = Payload;

    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Payload> {
        match request.operation() {
            ops::VULNERABILITIES => {
                let advisories = self
                    .vulnerabilities(request.require("name")?, request.get("version"))
                    .await?;
                Ok(Payload::Vulnerabilities(Arc::new(advisories)))
            }
            other => Err(GatewayError::Internal(format!(
                "{} upstream cannot serve operation '{other}'",
                Self::NAME
            ))),
        }
    }
}
