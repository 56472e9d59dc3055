//! Gateway error types

use std::time::Duration;

/// Coarse classification of a [`GatewayError`].
///
/// Callers that only need to decide how to report a failure match on this
/// rather than on the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The upstream authoritatively says the entity does not exist.
    NotFound,
    /// Malformed parameters, caught locally or rejected by the upstream.
    InvalidRequest,
    /// A failure that may succeed on retry (timeout, 5xx, rate limit).
    Transient,
    /// Transient failures persisted through every retry.
    Exhausted,
    /// Invariant violation or unusable upstream/configuration data.
    Internal,
}

/// Gateway error types
///
/// `Clone` so one upstream outcome can be delivered to every caller
/// waiting on the same fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    // Upstream outcomes
    #[error("{0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Transient failures that outlived the retry budget.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: Box<GatewayError>,
    },

    // Data errors
    #[error("unexpected upstream response: {0}")]
    Decode(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// Connection failures, timeouts, rate limiting and 5xx responses are
    /// transient. Everything else, including [`GatewayError::Exhausted`],
    /// is terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Http(_) | GatewayError::Timeout { .. } => true,
            GatewayError::RateLimited { .. } => true,
            GatewayError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Upstream-provided hint for how long to wait before retrying.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Map this error onto the coarse [`ErrorKind`] taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            GatewayError::Exhausted { .. } => ErrorKind::Exhausted,
            GatewayError::Api { status, .. } if *status == 404 => ErrorKind::NotFound,
            e if e.is_transient() => ErrorKind::Transient,
            GatewayError::Api { .. } => ErrorKind::InvalidRequest,
            _ => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
