//! Caching subsystem.
//!
//! - [`ResultCache`]: the process-wide LRU + TTL store for upstream fetch
//!   results, with hit/miss accounting. Owned by the
//!   [`Gateway`](crate::Gateway) and shared by every fetcher.
//! - [`CacheKey`]: the validated, non-empty key entries are stored under.
//!   Built from a [`FetchRequest`](crate::fetch::FetchRequest), never by hand
//!   outside tests.

pub mod result;

pub use result::{CacheConfig, CacheStats, ResultCache};

use std::fmt;

use crate::{GatewayError, Result};

/// Key for a [`ResultCache`] entry.
///
/// Carries the operation name alongside the encoded key so cache metrics can
/// be labelled per operation. Equality and hashing cover both; the encoded
/// form already embeds the operation, so no two operations ever share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    encoded: String,
}

impl CacheKey {
    /// Build a key, rejecting an empty encoded form.
    pub fn new(operation: impl Into<String>, encoded: impl Into<String>) -> Result<Self> {
        let operation = operation.into();
        let encoded = encoded.into();
        if encoded.is_empty() {
            return Err(GatewayError::Internal(format!(
                "empty cache key for operation '{operation}'"
            )));
        }
        Ok(Self { operation, encoded })
    }

    /// Operation this key belongs to.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Encoded key string.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        let err = CacheKey::new("package_info", "").unwrap_err();
        assert!(err.to_string().contains("package_info"));
    }

    #[test]
    fn key_displays_encoded_form() {
        let key = CacheKey::new("pkg", "pkg:alpha").unwrap();
        assert_eq!(key.to_string(), "pkg:alpha");
        assert_eq!(key.operation(), "pkg");
    }
}
