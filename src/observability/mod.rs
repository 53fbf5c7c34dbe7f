//! Observability module providing logging, metrics, and tracing hooks.

mod logging;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

use crate::errors::{RateLimitInfo, ScrapeError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Metrics collector for one scraper run.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_failed: AtomicU64,
    pages_fetched: AtomicU64,
    entities_fetched: AtomicU64,
    endpoints_empty: AtomicU64,
    latency_total_us: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful request.
    pub fn record_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed request.
    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a non-empty page and its item count.
    pub fn record_page(&self, items: usize) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.entities_fetched.fetch_add(items as u64, Ordering::Relaxed);
    }

    /// Records an endpoint that degraded to an empty result.
    pub fn record_endpoint_empty(&self) {
        self.endpoints_empty.fetch_add(1, Ordering::Relaxed);
    }

    /// Records request latency.
    pub fn record_latency(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.latency_total_us.fetch_add(us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the average latency in microseconds.
    pub fn average_latency_us(&self) -> u64 {
        let total = self.latency_total_us.load(Ordering::Relaxed);
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            0
        } else {
            total / count
        }
    }

    /// Gets a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            entities_fetched: self.entities_fetched.load(Ordering::Relaxed),
            endpoints_empty: self.endpoints_empty.load(Ordering::Relaxed),
            average_latency_us: self.average_latency_us(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// HTTP requests issued.
    pub requests_total: u64,
    /// Requests answered with a success status.
    pub requests_success: u64,
    /// Requests that failed.
    pub requests_failed: u64,
    /// Non-empty pages read.
    pub pages_fetched: u64,
    /// Items read across all pages.
    pub entities_fetched: u64,
    /// Fetches that degraded to an empty result.
    pub endpoints_empty: u64,
    /// Average latency in microseconds.
    pub average_latency_us: u64,
}

/// Request timer for measuring latency.
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<Metrics>,
}

impl RequestTimer {
    /// Creates a new request timer.
    pub fn new(metrics: Arc<Metrics>) -> Self {
        metrics.record_request();
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    /// Records success and latency.
    pub fn success(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.metrics.record_success();
        self.metrics.record_latency(elapsed);
        elapsed
    }

    /// Records failure and latency.
    pub fn failure(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.metrics.record_failure();
        self.metrics.record_latency(elapsed);
        elapsed
    }
}

/// Tracing hooks for scraper events.
pub struct ScrapeHooks;

impl ScrapeHooks {
    /// Logs the start of an API request.
    pub fn on_request_start(url: &str) {
        debug!(url = %url, "GitHub API request started");
    }

    /// Logs the completion of an API request.
    pub fn on_request_complete(url: &str, status: u16, duration: Duration) {
        debug!(
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "GitHub API request completed"
        );
    }

    /// Logs a request error.
    pub fn on_request_error(url: &str, error: &ScrapeError) {
        debug!(url = %url, error = %error, "GitHub API request failed");
    }

    /// Logs a fetch that was degraded to an empty result.
    pub fn on_endpoint_empty(endpoint: &str, context: &str, error: &ScrapeError) {
        warn!(
            endpoint = %endpoint,
            context = %context,
            kind = %error.kind(),
            "No data for {} ({}): {}",
            endpoint,
            context,
            error.message()
        );
    }

    /// Logs a fetch that failed in transport.
    pub fn on_fetch_failed(endpoint: &str, context: &str, error: &ScrapeError) {
        warn!(
            endpoint = %endpoint,
            context = %context,
            kind = %error.kind(),
            "Fetching {} ({}) failed: {}",
            endpoint,
            context,
            error.message()
        );
    }

    /// Logs the end of a batch.
    pub fn on_batch_complete(requests: usize, failures: usize, duration: Duration) {
        info!(
            requests = requests,
            failures = failures,
            duration_ms = duration.as_millis() as u64,
            "Batch complete"
        );
    }

    /// Logs rate limit exceeded.
    pub fn on_rate_limit_exceeded(info: &RateLimitInfo) {
        warn!(
            limit = info.limit,
            remaining = info.remaining,
            reset_at = %info.reset_at,
            "Rate limit exceeded"
        );
    }
}
