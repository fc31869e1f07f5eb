use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

/// Minimum-interval pacer for callers issuing consecutive fetches.
///
/// The retrievers never pace themselves; the CLI waits on one of these
/// between pages and between authors.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request_time: Option<Instant>,
}

impl RateLimiter {
    /// Create a rate limiter with the specified rate (requests per second)
    #[must_use]
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::from_secs(1)
        };
        Self::from_interval(min_interval)
    }

    /// Create a rate limiter enforcing `min_interval` between requests
    #[must_use]
    pub const fn from_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_time: None,
        }
    }

    /// Wait until it's safe to make a request
    pub async fn acquire(&mut self) {
        if let Some(wait_time) = self.time_until_ready() {
            debug!("Rate limiter: waiting {}ms", wait_time.as_millis());
            sleep(wait_time).await;
        }

        self.last_request_time = Some(Instant::now());
    }

    /// Check if a request would be allowed without waiting
    #[must_use]
    pub fn check(&self) -> bool {
        self.time_until_ready().is_none()
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Get time until next request is allowed
    #[must_use]
    pub fn time_until_ready(&self) -> Option<Duration> {
        self.last_request_time.and_then(|last_time| {
            let elapsed = last_time.elapsed();
            if elapsed >= self.min_interval {
                None
            } else {
                Some(self.min_interval - elapsed)
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_basic() {
        let mut limiter = RateLimiter::new(2.0);

        // First request should be immediate
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));

        // Second request waits for the interval
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[test]
    fn test_rate_limiter_check() {
        let limiter = RateLimiter::new(1.0);
        assert!(limiter.check());
        assert_eq!(limiter.time_until_ready(), None);
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let mut limiter = RateLimiter::from_interval(Duration::ZERO);
        limiter.acquire().await;
        assert!(limiter.check());
    }

    #[test]
    fn test_non_positive_rate_falls_back() {
        assert_eq!(RateLimiter::new(0.0).min_interval(), Duration::from_secs(1));
    }
}
