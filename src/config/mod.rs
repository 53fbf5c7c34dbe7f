//! Configuration types for the scraper.

mod sources;

pub use sources::{read_organizations, ORGANIZATION_COLUMN};

use crate::errors::{ScrapeError, ScrapeErrorKind};
use std::time::Duration;

/// Default GitHub API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default GitHub API version (date-based).
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "org-scraper/0.1.0";

/// Largest page size the API accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Default ceiling on in-flight requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 16;

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle connections per host.
    pub max_idle_per_host: usize,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 20,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Scraper transport configuration.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// API base URL.
    pub base_url: String,
    /// API version header.
    pub api_version: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Items requested per page.
    pub per_page: u32,
    /// Upper bound on requests in flight at once.
    pub max_concurrent_requests: usize,
    /// Connection pool configuration.
    pub pool: PoolConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            per_page: MAX_PER_PAGE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            pool: PoolConfig::default(),
        }
    }
}

impl ScraperConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ScraperConfigBuilder {
        ScraperConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.base_url.is_empty() {
            return Err(ScrapeError::new(
                ScrapeErrorKind::InvalidBaseUrl,
                "Base URL cannot be empty",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ScrapeError::new(
                ScrapeErrorKind::InvalidBaseUrl,
                "Base URL must start with http:// or https://",
            ));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(ScrapeError::new(
                ScrapeErrorKind::InvalidBaseUrl,
                format!("Base URL is not a valid URL: {}", self.base_url),
            ));
        }

        if self.user_agent.is_empty() {
            return Err(ScrapeError::configuration("User-Agent is required by GitHub API"));
        }

        if self.per_page == 0 {
            return Err(ScrapeError::configuration("per_page must be at least 1"));
        }

        if self.max_concurrent_requests == 0 {
            return Err(ScrapeError::configuration(
                "max_concurrent_requests must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Builder for ScraperConfig.
#[derive(Debug, Default)]
pub struct ScraperConfigBuilder {
    base_url: Option<String>,
    api_version: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    per_page: Option<u32>,
    max_concurrent_requests: Option<usize>,
    pool: Option<PoolConfig>,
}

impl ScraperConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the page size. Values above the API maximum are clamped.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page.min(MAX_PER_PAGE));
        self
    }

    /// Sets the in-flight request ceiling.
    pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = Some(limit);
        self
    }

    /// Sets the connection pool configuration.
    pub fn pool(mut self, config: PoolConfig) -> Self {
        self.pool = Some(config);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<ScraperConfig, ScrapeError> {
        let config = ScraperConfig {
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_version: self.api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            per_page: self.per_page.unwrap_or(MAX_PER_PAGE),
            max_concurrent_requests: self
                .max_concurrent_requests
                .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS),
            pool: self.pool.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScraperConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.per_page, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ScraperConfig::builder()
            .base_url("https://github.example.com/api/v3")
            .user_agent("test-client/1.0")
            .timeout(Duration::from_secs(60))
            .max_concurrent_requests(4)
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://github.example.com/api/v3");
        assert_eq!(config.user_agent, "test-client/1.0");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_concurrent_requests, 4);
    }

    #[test]
    fn test_per_page_is_clamped() {
        let config = ScraperConfig::builder().per_page(500).build().unwrap();
        assert_eq!(config.per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ScraperConfig::builder().base_url("invalid-url").build().unwrap_err();
        assert_eq!(err.kind(), ScrapeErrorKind::InvalidBaseUrl);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = ScraperConfig::builder().max_concurrent_requests(0).build();
        assert!(result.is_err());
    }
}
