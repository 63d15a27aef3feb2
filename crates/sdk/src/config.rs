//! Client configuration with builder pattern.
//!
//! Provides type-safe configuration for the console client:
//! - Backend base URL
//! - Request timeout
//! - Notification polling interval and fetch limit
//! - Default page size for list views
//! - Optional session persistence path

use std::path::PathBuf;
use std::time::Duration;

use snafu::ensure;
use url::Url;

use crate::error::{ConfigSnafu, Result};

/// Default request timeout (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default notification polling interval (30 seconds).
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default notification fetch limit.
const DEFAULT_NOTIFICATION_LIMIT: usize = 20;

/// Default items-per-page for list views.
const DEFAULT_PAGE_SIZE: usize = 10;

/// Configuration for the console client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, normalized to end with `/`.
    pub(crate) base_url: Url,

    /// Request timeout.
    pub(crate) timeout: Duration,

    /// Notification polling interval.
    pub(crate) poll_interval: Duration,

    /// Maximum notifications fetched per poll.
    pub(crate) notification_limit: usize,

    /// Default items-per-page for list views.
    pub(crate) page_size: usize,

    /// Session persistence path; in-memory session when absent.
    pub(crate) session_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns the backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the notification polling interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the notification fetch limit.
    #[must_use]
    pub fn notification_limit(&self) -> usize {
        self.notification_limit
    }

    /// Returns the default items-per-page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the session persistence path, if configured.
    #[must_use]
    pub fn session_file(&self) -> Option<&PathBuf> {
        self.session_file.as_ref()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    notification_limit: Option<usize>,
    page_size: Option<usize>,
    session_file: Option<PathBuf>,
}

impl ClientConfigBuilder {
    /// Sets the backend base URL. Required; must be `http` or `https`.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
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

    /// Sets the notification polling interval.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the maximum number of notifications fetched per poll.
    ///
    /// Default: 20.
    #[must_use]
    pub fn with_notification_limit(mut self, limit: usize) -> Self {
        self.notification_limit = Some(limit);
        self
    }

    /// Sets the default items-per-page for list views.
    ///
    /// Default: 10.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Persists the session to the given file so it survives restarts.
    ///
    /// Default: in-memory only.
    #[must_use]
    pub fn with_session_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Builds the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No base URL provided, or it is not a valid http(s) URL
    /// - Timeout or poll interval is zero
    /// - Notification limit or page size is zero
    pub fn build(self) -> Result<ClientConfig> {
        let raw = self
            .base_url
            .ok_or_else(|| ConfigSnafu { message: "base_url is required" }.build())?;

        let mut base_url = Url::parse(&raw)
            .map_err(|err| ConfigSnafu { message: format!("invalid base_url {raw:?}: {err}") }.build())?;
        ensure!(
            matches!(base_url.scheme(), "http" | "https"),
            ConfigSnafu { message: format!("base_url must be http(s), got {:?}", base_url.scheme()) }
        );
        // Relative endpoint paths join against the base, so it must end with `/`.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        ensure!(!timeout.is_zero(), ConfigSnafu { message: "timeout cannot be zero" });

        let poll_interval = self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        ensure!(!poll_interval.is_zero(), ConfigSnafu { message: "poll_interval cannot be zero" });

        let notification_limit = self.notification_limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT);
        ensure!(
            notification_limit > 0,
            ConfigSnafu { message: "notification_limit cannot be zero" }
        );

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        ensure!(page_size > 0, ConfigSnafu { message: "page_size cannot be zero" });

        Ok(ClientConfig {
            base_url,
            timeout,
            poll_interval,
            notification_limit,
            page_size,
            session_file: self.session_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ClientConfig::builder()
            .with_base_url("https://console.example.com/api")
            .build()
            .unwrap();
        assert_eq!(config.base_url().as_str(), "https://console.example.com/api/");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(config.notification_limit(), DEFAULT_NOTIFICATION_LIMIT);
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_missing_base_url() {
        let err = ClientConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = ClientConfig::builder().with_base_url("ftp://example.com").build().unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = ClientConfig::builder()
            .with_base_url("http://localhost:4000")
            .with_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let err = ClientConfig::builder()
            .with_base_url("http://localhost:4000")
            .with_page_size(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }
}
