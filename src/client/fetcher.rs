use super::headers::{fixed_headers, rotating_headers};
use super::{HttpTransport, RequestOptionsProvider, RequestParameters, Transport};
use crate::{Config, Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};
use url::Url;

/// Upper bound for one wait between attempts, including server `Retry-After` hints
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// One logical page fetch: endpoint, transport, per-attempt options and a bounded retry budget.
///
/// Cloning is cheap; every retriever owns its own copy.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    options: RequestOptionsProvider,
    endpoint: Url,
    base: Url,
    language: String,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("endpoint", &self.endpoint.as_str())
            .field("language", &self.language)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Fetcher over the reqwest transport described by `config`
    pub fn new(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.http)?);
        Self::with_transport(config, transport)
    }

    /// Fetcher over a caller-supplied transport
    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let options = if config.http.rotate_headers {
            rotating_headers()
        } else {
            fixed_headers()
        };

        Ok(Self {
            transport,
            options,
            endpoint: config.scholar.endpoint()?,
            base: config.scholar.base()?,
            language: config.scholar.language.clone(),
            max_attempts: config.http.max_retries,
            retry_base_delay: config.http.retry_base_delay(),
        })
    }

    /// Replace the per-attempt options callback
    #[must_use]
    pub fn with_request_options(mut self, options: RequestOptionsProvider) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Base used to absolutize links found in fetched documents
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Interface language new retrievers start with
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        let base_ms = u64::try_from(self.retry_base_delay.as_millis()).unwrap_or(u64::MAX);
        // 2^n * factor: base, 2*base, 4*base, ...
        ExponentialBackoff::from_millis(2)
            .factor(base_ms / 2)
            .max_delay(MAX_RETRY_DELAY)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Fetch the document for `params`.
    ///
    /// Retryable transport errors are retried within the budget; the outcome is either the
    /// body or a single `TransportFailure` carrying the last underlying error. A rate-limit
    /// response's `Retry-After` hint replaces the backoff delay, capped at 30 seconds.
    pub async fn fetch(&self, params: &RequestParameters) -> Result<String> {
        let attempts = AtomicU32::new(0);
        let not_before: Mutex<Option<Instant>> = Mutex::new(None);

        let result = RetryIf::spawn(
            self.retry_strategy(),
            || {
                let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
                let wait = not_before
                    .lock()
                    .ok()
                    .and_then(|mut deadline| deadline.take())
                    .map(|deadline| deadline.saturating_duration_since(Instant::now()));
                let options = (self.options)();
                async move {
                    if let Some(wait) = wait.filter(|w| !w.is_zero()) {
                        debug!("Honoring Retry-After, waiting {:?}", wait);
                        tokio::time::sleep(wait).await;
                    }
                    debug!(
                        "Fetching {} (attempt {}/{})",
                        self.endpoint, attempt, self.max_attempts
                    );
                    self.transport.get(&self.endpoint, params, options).await
                }
            },
            |error: &Error| {
                let retry = error.is_retryable();
                if retry {
                    warn!("Retryable failure fetching {}: {}", self.endpoint, error);
                    if let Some(hint) = error.retry_after() {
                        if let Ok(mut deadline) = not_before.lock() {
                            *deadline = Some(Instant::now() + hint.min(MAX_RETRY_DELAY));
                        }
                    }
                }
                retry
            },
        )
        .await;

        result.map_err(|error| {
            let attempts = attempts.load(Ordering::Relaxed);
            warn!(
                "Giving up on {} after {} attempt(s): {}",
                self.endpoint, attempts, error
            );
            Error::TransportFailure {
                attempts,
                reason: error.to_string(),
            }
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::client::RequestOptions;

    fn unavailable() -> Error {
        Error::HttpStatus {
            code: 503,
            url: "https://scholar.google.com/citations".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_success_first_attempt() {
        let transport = ScriptedTransport::new();
        transport.push_ok("<html></html>");
        let fetcher = fetcher(transport.clone());

        let body = fetcher.fetch(&RequestParameters::new()).await.unwrap();
        assert_eq!(body, "<html></html>");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let transport = ScriptedTransport::new();
        transport.push_err(unavailable());
        transport.push_ok("<html>ok</html>");
        let fetcher = fetcher(transport.clone());

        let body = fetcher.fetch(&RequestParameters::new()).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_budget_is_single_failure() {
        let transport = ScriptedTransport::new();
        for _ in 0..5 {
            transport.push_err(unavailable());
        }
        let fetcher = fetcher(transport.clone());

        let err = fetcher.fetch(&RequestParameters::new()).await.unwrap_err();
        match err {
            Error::TransportFailure { attempts, reason } => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let transport = ScriptedTransport::new();
        transport.push_err(Error::HttpStatus {
            code: 404,
            url: "https://scholar.google.com/citations".to_string(),
        });
        let fetcher = fetcher(transport.clone());

        let err = fetcher.fetch(&RequestParameters::new()).await.unwrap_err();
        assert!(matches!(err, Error::TransportFailure { attempts: 1, .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_delays_next_attempt() {
        let transport = ScriptedTransport::new();
        transport.push_err(Error::RateLimitExceeded {
            retry_after: Duration::from_secs(5),
        });
        transport.push_ok("<html>ok</html>");
        let fetcher = fetcher(transport.clone());

        let started = tokio::time::Instant::now();
        let body = fetcher.fetch(&RequestParameters::new()).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
        assert_eq!(transport.requests().len(), 2);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_options_callback_invoked_per_attempt() {
        let transport = ScriptedTransport::new();
        transport.push_err(unavailable());
        transport.push_ok("<html></html>");

        let counter = Arc::new(AtomicU32::new(0));
        let seen = counter.clone();
        let fetcher = fetcher(transport.clone()).with_request_options(Arc::new(move || {
            let n = seen.fetch_add(1, Ordering::Relaxed);
            RequestOptions::default().with_header("User-Agent", format!("agent-{n}"))
        }));

        fetcher.fetch(&RequestParameters::new()).await.unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 2);

        let agents: Vec<String> = transport
            .options_seen()
            .iter()
            .filter_map(|o| o.header("User-Agent").map(ToString::to_string))
            .collect();
        assert_eq!(agents, vec!["agent-0".to_string(), "agent-1".to_string()]);
    }
}
