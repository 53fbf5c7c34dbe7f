//! HTTP transport for the GitHub REST API.

use crate::auth::Credentials;
use crate::config::{ScraperConfig, ScraperConfigBuilder};
use crate::errors::{RateLimitInfo, ScrapeError, ScrapeErrorKind, ScrapeResult};
use crate::observability::{Metrics, RequestTimer, ScrapeHooks};
use crate::pagination::PaginationParams;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// GitHub error response format.
#[derive(Debug, serde::Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Issues GET requests and returns decoded JSON bodies.
///
/// Implementations must be safe to share between concurrently running
/// fetch tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GETs `path` (relative to the API base) with the given query parameters.
    async fn get_json(&self, path: &str, params: &PaginationParams) -> ScrapeResult<Value>;
}

/// Transport backed by a pooled `reqwest` client.
///
/// A semaphore caps the number of requests in flight so a large batch
/// cannot open more connections than `max_concurrent_requests`.
pub struct HttpTransport {
    http: Client,
    config: ScraperConfig,
    credentials: Credentials,
    permits: Arc<Semaphore>,
    metrics: Arc<Metrics>,
}

impl HttpTransport {
    /// Creates a new transport.
    pub fn new(config: ScraperConfig, credentials: Credentials) -> ScrapeResult<Self> {
        Self::with_metrics(config, credentials, Arc::new(Metrics::new()))
    }

    /// Creates a new transport that reports into shared metrics.
    pub fn with_metrics(
        config: ScraperConfig,
        credentials: Credentials,
        metrics: Arc<Metrics>,
    ) -> ScrapeResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(config.pool.idle_timeout)
            .build()
            .map_err(|e| {
                ScrapeError::new(
                    ScrapeErrorKind::InvalidConfiguration,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        let permits = Arc::new(Semaphore::new(config.max_concurrent_requests));

        Ok(Self {
            http,
            config,
            credentials,
            permits,
            metrics,
        })
    }

    /// Creates a new transport builder.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Gets the shared metrics.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn classify_send_error(e: reqwest::Error) -> ScrapeError {
        if e.is_timeout() {
            ScrapeError::timeout(format!("Request timed out: {}", e))
        } else if e.is_connect() {
            ScrapeError::new(
                ScrapeErrorKind::ConnectionFailed,
                format!("Connection failed: {}", e),
            )
        } else {
            ScrapeError::new(ScrapeErrorKind::RequestFailed, format!("Request failed: {}", e))
        }
    }

    fn extract_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let limit = header("x-ratelimit-limit")?.parse().ok()?;
        let remaining = header("x-ratelimit-remaining")?.parse().ok()?;
        let reset_timestamp: i64 = header("x-ratelimit-reset")?.parse().ok()?;
        let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

        Some(RateLimitInfo {
            limit,
            remaining,
            reset_at,
        })
    }

    async fn handle_error_response(response: Response) -> ScrapeError {
        let status = response.status();
        let rate_limit = Self::extract_rate_limit(response.headers());

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(info) = rate_limit.filter(|info| info.remaining == 0) {
                ScrapeHooks::on_rate_limit_exceeded(&info);
                return ScrapeError::rate_limited(status.as_u16(), info);
            }
        }

        let message = response
            .json::<GitHubErrorResponse>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| format!("HTTP {} error", status.as_u16()));

        ScrapeError::from_status(status.as_u16(), message)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, path: &str, params: &PaginationParams) -> ScrapeResult<Value> {
        let query = params.to_query_string()?;
        let url = if query.is_empty() {
            self.build_url(path)
        } else {
            format!("{}?{}", self.build_url(path), query)
        };

        let _permit = self.permits.acquire().await.map_err(|_| {
            ScrapeError::new(ScrapeErrorKind::RequestFailed, "Request limiter closed")
        })?;

        ScrapeHooks::on_request_start(&url);
        let timer = RequestTimer::new(self.metrics.clone());

        let sent = self
            .http
            .get(&url)
            .basic_auth(
                self.credentials.username(),
                Some(self.credentials.token().expose_secret()),
            )
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", &self.config.api_version)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let error = Self::classify_send_error(e).with_endpoint(path);
                timer.failure();
                ScrapeHooks::on_request_error(&url, &error);
                return Err(error);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error = Self::handle_error_response(response).await.with_endpoint(path);
            timer.failure();
            ScrapeHooks::on_request_error(&url, &error);
            return Err(error);
        }

        let body = response.json::<Value>().await.map_err(|e| {
            ScrapeError::new(
                ScrapeErrorKind::InvalidJson,
                format!("Failed to deserialize response: {}", e),
            )
            .with_status(status.as_u16())
            .with_endpoint(path)
        });

        match body {
            Ok(body) => {
                let elapsed = timer.success();
                ScrapeHooks::on_request_complete(&url, status.as_u16(), elapsed);
                Ok(body)
            }
            Err(error) => {
                timer.failure();
                ScrapeHooks::on_request_error(&url, &error);
                Err(error)
            }
        }
    }
}

/// Builder for HttpTransport.
pub struct HttpTransportBuilder {
    config_builder: ScraperConfigBuilder,
    credentials: Option<Credentials>,
    metrics: Option<Arc<Metrics>>,
}

impl HttpTransportBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: ScraperConfig::builder(),
            credentials: None,
            metrics: None,
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the in-flight request ceiling.
    pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
        self.config_builder = self.config_builder.max_concurrent_requests(limit);
        self
    }

    /// Reports into shared metrics.
    pub fn metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the transport.
    pub fn build(self) -> ScrapeResult<HttpTransport> {
        let config = self.config_builder.build()?;
        let credentials = self.credentials.ok_or_else(|| {
            ScrapeError::new(ScrapeErrorKind::MissingCredentials, "Credentials required")
        })?;
        HttpTransport::with_metrics(config, credentials, self.metrics.unwrap_or_default())
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("octocat", "ghp_test").unwrap()
    }

    #[test]
    fn test_build_url() {
        let transport = HttpTransport::new(ScraperConfig::default(), credentials()).unwrap();

        assert_eq!(
            transport.build_url("/orgs/acme/repos"),
            "https://api.github.com/orgs/acme/repos"
        );
        assert_eq!(
            transport.build_url("orgs/acme/repos"),
            "https://api.github.com/orgs/acme/repos"
        );
    }

    #[test]
    fn test_builder_requires_credentials() {
        let err = HttpTransport::builder().build().err().unwrap();
        assert_eq!(err.kind(), ScrapeErrorKind::MissingCredentials);
    }

    #[test]
    fn test_extract_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", "5000".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
        headers.insert("x-ratelimit-reset", "1700000000".parse().unwrap());

        let info = HttpTransport::extract_rate_limit(&headers).unwrap();
        assert_eq!(info.limit, 5000);
        assert_eq!(info.remaining, 0);
        assert_eq!(info.reset_at.timestamp(), 1_700_000_000);

        assert!(HttpTransport::extract_rate_limit(&HeaderMap::new()).is_none());
    }
}
