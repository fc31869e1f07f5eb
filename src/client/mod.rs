pub mod fetcher;
pub mod headers;
pub mod params;
pub mod rate_limiter;
pub mod transport;

pub use fetcher::Fetcher;
pub use params::{ParamValue, RequestParameters};
pub use rate_limiter::RateLimiter;
pub use transport::{HttpTransport, Transport};

use std::sync::Arc;
use std::time::Duration;

/// Per-attempt request options (headers, timeout, proxy)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Extra headers sent with the request
    pub headers: Vec<(String, String)>,
    /// Overrides the client-wide timeout for this attempt
    pub timeout: Option<Duration>,
    /// Proxy URL used for this attempt only
    pub proxy: Option<String>,
}

impl RequestOptions {
    /// Value of the first header named `name` (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// Zero-argument callback invoked once per request attempt.
///
/// Useful for proxy and/or user-agent rotation.
pub type RequestOptionsProvider = Arc<dyn Fn() -> RequestOptions + Send + Sync>;
