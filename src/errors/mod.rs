//! Error types for the scraper.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Result type alias for scraper operations.
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Error kinds for categorizing scraper errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeErrorKind {
    // Configuration errors
    /// Username or token missing.
    MissingCredentials,
    /// No organizations to scrape.
    MissingOrganizations,
    /// Invalid base URL.
    InvalidBaseUrl,
    /// Invalid configuration.
    InvalidConfiguration,
    /// No operation was selected.
    NoOperationSelected,

    // Transport errors
    /// Connection failed.
    ConnectionFailed,
    /// Request timeout.
    Timeout,
    /// Any other transport failure.
    RequestFailed,

    // HTTP status errors
    /// Bad credentials (401).
    BadCredentials,
    /// Access forbidden (403).
    Forbidden,
    /// Resource not found (404).
    NotFound,
    /// Empty repository or other conflict (409).
    Conflict,
    /// Server side failure (5xx).
    ServerError,
    /// Any other non-success status.
    UnexpectedStatus,

    // Rate limit errors
    /// Rate limit exhausted.
    RateLimitExceeded,

    // Response errors
    /// Body is not valid JSON.
    InvalidJson,
    /// Body is JSON but not the expected shape.
    UnexpectedShape,

    // Export errors
    /// Writing an export file failed.
    Io,
    /// Serializing an export failed.
    Serialization,

    // Generic
    /// A fetch task ended without reporting.
    TaskFailed,
}

impl fmt::Display for ScrapeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingCredentials => "missing_credentials",
            Self::MissingOrganizations => "missing_organizations",
            Self::InvalidBaseUrl => "invalid_base_url",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::NoOperationSelected => "no_operation_selected",
            Self::ConnectionFailed => "connection_failed",
            Self::Timeout => "timeout",
            Self::RequestFailed => "request_failed",
            Self::BadCredentials => "bad_credentials",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::ServerError => "server_error",
            Self::UnexpectedStatus => "unexpected_status",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InvalidJson => "invalid_json",
            Self::UnexpectedShape => "unexpected_shape",
            Self::Io => "io",
            Self::Serialization => "serialization",
            Self::TaskFailed => "task_failed",
        };
        f.write_str(name)
    }
}

/// Broad error classes that drive propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Fatal before any fetch.
    Configuration,
    /// Network failure.
    Transport,
    /// Non-success HTTP status.
    Http,
    /// Rate limit exhausted.
    RateLimit,
    /// Body could not be decoded into the expected shape.
    Decode,
    /// Export file could not be written.
    Export,
}

impl ScrapeErrorKind {
    /// Returns the class this kind belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingCredentials
            | Self::MissingOrganizations
            | Self::InvalidBaseUrl
            | Self::InvalidConfiguration
            | Self::NoOperationSelected => ErrorClass::Configuration,
            Self::ConnectionFailed | Self::Timeout | Self::RequestFailed | Self::TaskFailed => {
                ErrorClass::Transport
            }
            Self::BadCredentials
            | Self::Forbidden
            | Self::NotFound
            | Self::Conflict
            | Self::ServerError
            | Self::UnexpectedStatus => ErrorClass::Http,
            Self::RateLimitExceeded => ErrorClass::RateLimit,
            Self::InvalidJson | Self::UnexpectedShape => ErrorClass::Decode,
            Self::Io | Self::Serialization => ErrorClass::Export,
        }
    }
}

/// Rate limit headers captured from a failed response.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Maximum requests allowed.
    pub limit: u32,
    /// Remaining requests in current window.
    pub remaining: u32,
    /// Time when the rate limit resets.
    pub reset_at: DateTime<Utc>,
}

/// Scraper error with detailed information.
#[derive(Error, Debug)]
pub struct ScrapeError {
    kind: ScrapeErrorKind,
    message: String,
    status_code: Option<u16>,
    endpoint: Option<String>,
    rate_limit: Option<RateLimitInfo>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        if let Some(ref endpoint) = self.endpoint {
            write!(f, " [endpoint: {}]", endpoint)?;
        }
        Ok(())
    }
}

impl ScrapeError {
    /// Creates a new scraper error.
    pub fn new(kind: ScrapeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            endpoint: None,
            rate_limit: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the endpoint the error belongs to.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the rate limit info.
    pub fn with_rate_limit(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit = Some(info);
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> ScrapeErrorKind {
        self.kind
    }

    /// Gets the error class.
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// Gets the message without decoration.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the endpoint.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Gets the rate limit info.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }

    /// Returns true if the run must stop on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Configuration | ErrorClass::Export)
    }

    /// Returns true if the endpoint should be treated as yielding no items.
    pub fn is_endpoint_empty(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Http | ErrorClass::RateLimit | ErrorClass::Decode
        )
    }

    /// Creates an error from a non-success status and the API's error message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(Self::kind_from_status(status), message).with_status(status)
    }

    fn kind_from_status(status: u16) -> ScrapeErrorKind {
        match status {
            401 => ScrapeErrorKind::BadCredentials,
            403 => ScrapeErrorKind::Forbidden,
            404 => ScrapeErrorKind::NotFound,
            409 => ScrapeErrorKind::Conflict,
            429 => ScrapeErrorKind::RateLimitExceeded,
            500..=599 => ScrapeErrorKind::ServerError,
            _ => ScrapeErrorKind::UnexpectedStatus,
        }
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorKind::InvalidConfiguration, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(status: u16, info: RateLimitInfo) -> Self {
        Self::new(ScrapeErrorKind::RateLimitExceeded, "API rate limit exceeded")
            .with_status(status)
            .with_rate_limit(info)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorKind::Timeout, message)
    }

    /// Creates a shape mismatch error.
    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorKind::UnexpectedShape, message)
    }

    /// Creates an I/O error for an export path.
    pub fn io(path: &std::path::Path, cause: std::io::Error) -> Self {
        Self::new(
            ScrapeErrorKind::Io,
            format!("Failed to write {}", path.display()),
        )
        .with_cause(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ScrapeError::new(ScrapeErrorKind::NotFound, "Not Found")
            .with_status(404)
            .with_endpoint("/orgs/acme/members");

        let display = format!("{}", error);
        assert!(display.contains("not_found"));
        assert!(display.contains("Not Found"));
        assert!(display.contains("404"));
        assert!(display.contains("/orgs/acme/members"));
    }

    #[test]
    fn test_from_status() {
        assert_eq!(ScrapeError::from_status(401, "x").kind(), ScrapeErrorKind::BadCredentials);
        assert_eq!(ScrapeError::from_status(409, "x").kind(), ScrapeErrorKind::Conflict);
        assert_eq!(ScrapeError::from_status(502, "x").kind(), ScrapeErrorKind::ServerError);
        assert_eq!(ScrapeError::from_status(418, "x").kind(), ScrapeErrorKind::UnexpectedStatus);
        assert_eq!(ScrapeError::from_status(429, "x").class(), ErrorClass::RateLimit);
    }

    #[test]
    fn test_propagation_policy() {
        let config = ScrapeError::new(ScrapeErrorKind::MissingCredentials, "no token");
        assert!(config.is_fatal());
        assert!(!config.is_endpoint_empty());

        let decode = ScrapeError::unexpected_shape("expected array");
        assert!(!decode.is_fatal());
        assert!(decode.is_endpoint_empty());

        let transport = ScrapeError::timeout("slow");
        assert!(!transport.is_fatal());
        assert!(!transport.is_endpoint_empty());
    }
}
