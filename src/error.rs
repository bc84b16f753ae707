//! Error types for the arbor-search crate.
//!
//! The taxonomy mirrors how callers are expected to react: validation and
//! quota errors are not retryable, rate-limit errors are retryable after the
//! reported wait, provider errors carry the upstream status code so the
//! caller can decide. No API tokens or query text appear in error messages.

/// Errors that can occur during search orchestration.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request was malformed (e.g. empty query). Rejected before any
    /// network call; never retryable.
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller's daily or monthly quota is exhausted.
    #[error("quota exceeded: {reason}")]
    QuotaExceeded {
        /// Human-readable reason (which limit was hit).
        reason: String,
        /// Whether moving to a higher tier would lift the limit.
        upgrade_required: bool,
    },

    /// The short-window rate limit is exhausted. Retryable after the wait.
    #[error("rate limited: retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after_secs: u64,
    },

    /// The external search provider returned a non-2xx response.
    #[error("provider error (status {status}): {message}")]
    Provider {
        /// HTTP status code from the provider.
        status: u16,
        /// Short message extracted from the response, if any.
        message: String,
    },

    /// An HTTP request could not be sent or the response body read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A search operation exceeded its deadline.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// Invalid service configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for arbor-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_validation() {
        let err = SearchError::Validation("query must not be empty".into());
        assert_eq!(err.to_string(), "validation error: query must not be empty");
    }

    #[test]
    fn display_quota_exceeded() {
        let err = SearchError::QuotaExceeded {
            reason: "daily limit reached".into(),
            upgrade_required: true,
        };
        assert_eq!(err.to_string(), "quota exceeded: daily limit reached");
    }

    #[test]
    fn display_rate_limited() {
        let err = SearchError::RateLimited {
            retry_after_secs: 42,
        };
        assert_eq!(err.to_string(), "rate limited: retry in 42s");
    }

    #[test]
    fn display_provider() {
        let err = SearchError::Provider {
            status: 429,
            message: "too many requests".into(),
        };
        assert_eq!(
            err.to_string(),
            "provider error (status 429): too many requests"
        );
    }

    #[test]
    fn display_timeout() {
        let err = SearchError::Timeout("exceeded 10s limit".into());
        assert_eq!(err.to_string(), "search timed out: exceeded 10s limit");
    }

    #[test]
    fn display_config() {
        let err = SearchError::Config("max_results must be > 0".into());
        assert_eq!(err.to_string(), "config error: max_results must be > 0");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
