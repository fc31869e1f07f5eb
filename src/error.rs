use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for retrieval, extraction and navigation
#[derive(Error, Debug)]
pub enum Error {
    // Caller errors (detected before any I/O)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // Navigation past the first or last page
    #[error("No such page: {0}")]
    NoSuchPage(String),

    // Terminal failure of one logical page fetch
    #[error("Transport failure after {attempts} attempt(s): {reason}")]
    TransportFailure { attempts: u32, reason: String },

    // Extraction errors (converted into empty records by the lenient parsers)
    #[error("Unrecognized page shape: missing {expected}")]
    UnrecognizedPageShape { expected: String },

    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // Network errors (transient - should retry)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {code} from {url}")]
    HttpStatus { code: u16, url: String },

    #[error("Rate limit exceeded: retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Error categorization for retry strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Permanent errors - should not retry
    Permanent,
    /// Transient errors - safe to retry
    Transient,
    /// Rate limited - retry with backoff
    RateLimited,
}

impl Error {
    /// Categorize error for retry logic
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::RateLimitExceeded { .. } => ErrorCategory::RateLimited,

            Self::Http(_) | Self::Timeout { .. } | Self::Io(_) => ErrorCategory::Transient,

            Self::HttpStatus { code, .. } => match *code {
                429 => ErrorCategory::RateLimited,
                // Google answers bot suspicion with 403 on some mirrors, which clears with rotation
                403 | 500..=599 => ErrorCategory::Transient,
                _ => ErrorCategory::Permanent,
            },

            Self::InvalidQuery(_)
            | Self::NoSuchPage(_)
            | Self::TransportFailure { .. }
            | Self::UnrecognizedPageShape { .. }
            | Self::Config(_)
            | Self::InvalidConfig { .. }
            | Self::Serde(_)
            | Self::Csv(_)
            | Self::Toml(_)
            | Self::Url(_) => ErrorCategory::Permanent,
        }
    }

    /// Check if error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transient | ErrorCategory::RateLimited
        )
    }

    /// Get suggested retry delay for rate limited errors
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Whether the error originated in the transport layer
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure { .. }
                | Self::Http(_)
                | Self::HttpStatus { .. }
                | Self::RateLimitExceeded { .. }
                | Self::Timeout { .. }
                | Self::Io(_)
        )
    }

    pub(crate) fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery(reason.into())
    }

    pub(crate) fn unrecognized(expected: impl Into<String>) -> Self {
        Self::UnrecognizedPageShape {
            expected: expected.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_categories() {
        let rate_limited = Error::HttpStatus {
            code: 429,
            url: "https://scholar.google.com/citations".to_string(),
        };
        assert_eq!(rate_limited.category(), ErrorCategory::RateLimited);
        assert!(rate_limited.is_retryable());

        let not_found = Error::HttpStatus {
            code: 404,
            url: "https://scholar.google.com/citations".to_string(),
        };
        assert_eq!(not_found.category(), ErrorCategory::Permanent);
        assert!(!not_found.is_retryable());

        let unavailable = Error::HttpStatus {
            code: 503,
            url: "https://scholar.google.com/citations".to_string(),
        };
        assert!(unavailable.is_retryable());
        assert!(unavailable.is_transport());
    }

    #[test]
    fn test_caller_errors_are_permanent() {
        assert!(!Error::invalid_query("author or label must be provided").is_retryable());
        assert!(!Error::NoSuchPage("Last page".to_string()).is_retryable());
        assert!(!Error::TransportFailure {
            attempts: 3,
            reason: "connection reset".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_exhausted_budget_is_transport() {
        let err = Error::TransportFailure {
            attempts: 3,
            reason: "connection reset".to_string(),
        };
        assert!(err.is_transport());
        assert!(!Error::invalid_query("x").is_transport());
        assert!(!Error::NoSuchPage("Last page".to_string()).is_transport());
    }

    #[test]
    fn test_display() {
        let err = Error::NoSuchPage("First page".to_string());
        assert_eq!(err.to_string(), "No such page: First page");

        let err = Error::unrecognized("div#gsc_prf");
        assert_eq!(err.to_string(), "Unrecognized page shape: missing div#gsc_prf");
    }

    #[test]
    fn test_retry_after() {
        let err = Error::RateLimitExceeded {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
        assert_eq!(Error::invalid_query("x").retry_after(), None);
    }
}
