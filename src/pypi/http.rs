//! Shared HTTP plumbing for the upstream clients.

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{GatewayError, Result};

/// Longest slice of an error body kept in [`GatewayError::Api`] messages.
const ERROR_BODY_LIMIT: usize = 200;

/// A `reqwest` client configured once and shared by every upstream.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client that sends `user_agent` and gives up on any single
    /// request after `timeout`. Redirects are followed.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let inner = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { inner, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and decode a JSON body.
    ///
    /// `context` names the call in error messages, e.g.
    /// `package_info(name=flask)`. `not_found` supplies the message for a 404.
    pub(crate) async fn get_json<T, F>(&self, context: &str, url: Url, not_found: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> String,
    {
        let response = self
            .inner
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.request_error(context, e))?;
        self.read_json(context, response, not_found).await
    }

    /// POST `body` as JSON to `url` and decode a JSON body.
    pub(crate) async fn post_json<B, T, F>(&self, context: &str, url: Url, body: &B, not_found: F) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
        F: FnOnce() -> String,
    {
        let response = self
            .inner
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(context, e))?;
        self.read_json(context, response, not_found).await
    }

    async fn read_json<T, F>(&self, context: &str, response: Response, not_found: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> String,
    {
        let response = handle_response_errors(context, response, not_found).await?;
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(context, e))?;
        serde_json::from_str(&body)
            .map_err(|e| GatewayError::Decode(format!("{context}: {e}")))
    }

    fn request_error(&self, context: &str, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout {
                operation: context.to_owned(),
                after: self.timeout,
            }
        } else {
            GatewayError::Http(format!("{context}: {err}"))
        }
    }
}

/// Map a non-success status to an error, passing successful responses
/// through.
///
/// 404 becomes `NotFound`, 429 becomes `RateLimited` (honouring a numeric
/// `Retry-After`), anything else becomes `Api` with `context` and a slice of
/// the body.
async fn handle_response_errors<F>(context: &str, response: Response, not_found: F) -> Result<Response>
where
    F: FnOnce() -> String,
{
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        404 => Err(GatewayError::NotFound(not_found())),
        429 => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(GatewayError::RateLimited { retry_after })
        }
        code => {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            let message = if snippet.trim().is_empty() {
                format!("{context}: {status}")
            } else {
                format!("{context}: {status}: {}", snippet.trim())
            };
            Err(GatewayError::Api {
                status: code,
                message,
            })
        }
    }
}

/// Parse a base URL, rejecting ones that cannot take path segments.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| GatewayError::Configuration(format!("invalid base URL '{base_url}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(GatewayError::Configuration(format!(
            "invalid base URL '{base_url}': cannot hold a path"
        )));
    }
    Ok(url)
}

/// `base` with `segments` appended, each percent-encoded.
pub(crate) fn join_path(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| GatewayError::Internal(format!("base URL '{base}' cannot hold a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_and_escapes_segments() {
        let base = parse_base_url("https://pypi.org").unwrap();
        let url = join_path(&base, &["pypi", "a b", "json"]).unwrap();
        assert_eq!(url.as_str(), "https://pypi.org/pypi/a%20b/json");
    }

    #[test]
    fn keeps_base_path_prefix() {
        let base = parse_base_url("http://mirror.local/simple-api/").unwrap();
        let url = join_path(&base, &["stats", ""]).unwrap();
        assert_eq!(url.as_str(), "http://mirror.local/simple-api/stats/");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("mailto:someone@example.org").is_err());
    }
}
