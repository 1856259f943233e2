//! Store configuration with builder pattern.
//!
//! Type-safe configuration for the REST adapter: base URL, service key,
//! timeouts, and the read-retry policy.

use std::time::Duration;

use snafu::ensure;

use crate::error::{ConfigSnafu, StoreError};

/// Default request timeout (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the REST store adapter.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the backend service (e.g., `https://project.supabase.co`).
    pub(crate) base_url: String,

    /// Service-role key; sent as both `apikey` and bearer token.
    pub(crate) service_key: String,

    /// Request timeout.
    pub(crate) timeout: Duration,

    /// Connection establishment timeout.
    pub(crate) connect_timeout: Duration,

    /// Retry policy for idempotent reads.
    pub(crate) retry: RetryPolicy,
}

impl StoreConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the read-retry policy.
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Builder for [`StoreConfig`].
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    base_url: Option<String>,
    service_key: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
}

impl StoreConfigBuilder {
    /// Sets the backend base URL. Must be an HTTP(S) URL.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the service-role key used to authenticate every request.
    #[must_use]
    pub fn with_service_key<S: Into<String>>(mut self, service_key: S) -> Self {
        self.service_key = Some(service_key.into());
        self
    }

    /// Sets the request timeout.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection establishment timeout.
    ///
    /// Default: 5 seconds.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy for idempotent reads.
    ///
    /// Default: [`RetryPolicy::default()`].
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Validates the configuration and builds a [`StoreConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the base URL is missing or not an
    /// HTTP(S) URL, or the service key is missing or empty.
    pub fn build(self) -> Result<StoreConfig, StoreError> {
        let base_url = self.base_url.unwrap_or_default();
        ensure!(!base_url.is_empty(), ConfigSnafu { message: "base_url must be set" });
        ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            ConfigSnafu { message: format!("base_url must be an HTTP(S) URL, got '{base_url}'") }
        );

        let service_key = self.service_key.unwrap_or_default();
        ensure!(!service_key.is_empty(), ConfigSnafu { message: "service_key must be set" });

        Ok(StoreConfig {
            // PostgREST paths are joined with '/', so strip any trailing one
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            retry: self.retry.unwrap_or_default(),
        })
    }
}

/// Exponential backoff policy for idempotent store reads.
///
/// Writes are never auto-retried: the approval steps are not idempotent and
/// the auditor reconciles their partial failures instead.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts (initial call + retries).
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single backoff.
    pub max_backoff: Duration,
    /// Backoff multiplier per attempt.
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_defaults() {
        let config = StoreConfig::builder()
            .with_base_url("https://project.supabase.co")
            .with_service_key("service-key")
            .build()
            .unwrap();
        assert_eq!(config.base_url(), "https://project.supabase.co");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.retry().max_attempts, 3);
    }

    #[test]
    fn test_build_strips_trailing_slash() {
        let config = StoreConfig::builder()
            .with_base_url("https://project.supabase.co/")
            .with_service_key("k")
            .build()
            .unwrap();
        assert_eq!(config.base_url(), "https://project.supabase.co");
    }

    #[test]
    fn test_build_missing_base_url() {
        let err = StoreConfig::builder().with_service_key("k").build().unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_build_non_http_base_url() {
        let err = StoreConfig::builder()
            .with_base_url("ftp://example.com")
            .with_service_key("k")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("HTTP"));
    }

    #[test]
    fn test_build_missing_service_key() {
        let err =
            StoreConfig::builder().with_base_url("http://localhost:54321").build().unwrap_err();
        assert!(err.to_string().contains("service_key"));
    }

    #[test]
    fn test_custom_timeouts() {
        let config = StoreConfig::builder()
            .with_base_url("http://localhost:54321")
            .with_service_key("k")
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
    }
}
