//! Service configuration with sensible defaults.
//!
//! [`ServiceConfig`] controls the provider endpoint, timeouts, cache sizing,
//! rate-limit windows, and fan-out concurrency. The defaults match the
//! documented orchestration behaviour; `validate` rejects configurations
//! that would disable the pipeline outright.

use std::time::Duration;

use crate::error::SearchError;

/// Configuration for the search orchestration service.
///
/// Use [`ServiceConfig::new`] with a subscription token, then override
/// fields as needed before constructing the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the web-search provider endpoint.
    pub endpoint: String,
    /// Subscription token sent in the auth header.
    pub api_token: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum number of cached responses before LRU eviction.
    pub cache_capacity: usize,
    /// Interval between background cache expiry sweeps.
    pub cache_sweep_interval: Duration,
    /// Rate-limit window length.
    pub rate_window: Duration,
    /// Interval between stale rate-window cleanups.
    pub rate_cleanup_interval: Duration,
    /// Maximum simultaneous outbound provider calls during fan-out.
    pub max_concurrency: usize,
    /// How many raw results to oversample before enhancement.
    pub oversample_count: usize,
}

impl ServiceConfig {
    /// Build a configuration with defaults for the given subscription token.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            endpoint: "https://api.search.brave.com/res/v1/web/search".into(),
            api_token: api_token.into(),
            timeout_seconds: 10,
            cache_capacity: 100,
            cache_sweep_interval: Duration::from_secs(600),
            rate_window: Duration::from_secs(24 * 60 * 60),
            rate_cleanup_interval: Duration::from_secs(3600),
            max_concurrency: 3,
            oversample_count: 15,
        }
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `endpoint` and `api_token` must not be empty
    /// - `timeout_seconds` must be greater than 0
    /// - `cache_capacity` and `max_concurrency` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.endpoint.trim().is_empty() {
            return Err(SearchError::Config("endpoint must not be empty".into()));
        }
        if self.api_token.trim().is_empty() {
            return Err(SearchError::Config("api_token must not be empty".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(SearchError::Config(
                "cache_capacity must be greater than 0".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(SearchError::Config(
                "max_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
