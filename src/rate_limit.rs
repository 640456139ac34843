//! Rate limit handling.
//!
//! The API answers `429 Too Many Requests` with a `Retry-After` header. When
//! handling is enabled the pipeline waits that long and tries again, up to the
//! configured [`Tries`] budget.

use crate::retry::Tries;
use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Information extracted from rate limit headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitInfo {
    /// How long to wait before retrying (from the `Retry-After` header).
    pub retry_after: Option<Duration>,

    /// When the rate limit resets (from `X-RateLimit-Reset` or `RateLimit-Reset`).
    pub reset_at: Option<SystemTime>,

    /// Number of requests remaining in the current window.
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Extracts rate limit information from HTTP response headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use openrobot_api::rate_limit::RateLimitInfo;
    /// use http::HeaderMap;
    /// use std::time::Duration;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "2.5".parse().unwrap());
    ///
    /// let info = RateLimitInfo::from_headers(&headers);
    /// assert_eq!(info.retry_after, Some(Duration::from_millis(2500)));
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            retry_after: parse_retry_after(headers),
            reset_at: parse_rate_limit_reset(headers),
            remaining: parse_rate_limit_remaining(headers),
        }
    }
}

/// Configuration for rate limit handling.
///
/// # Examples
///
/// ```
/// use openrobot_api::rate_limit::RateLimitConfig;
/// use openrobot_api::Tries;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::builder()
///     .tries(Tries::Limited(3))
///     .max_wait(Duration::from_secs(60))
///     .build();
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether to wait and retry on 429 responses.
    ///
    /// When disabled a 429 is returned as [`crate::Error::TooManyRequests`]
    /// straight away.
    pub enabled: bool,

    /// Total attempts allowed for one call, counting only rate-limited ones.
    pub tries: Tries,

    /// Upper bound for a single wait. `None` honors `Retry-After` as sent.
    pub max_wait: Option<Duration>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tries: Tries::default(),
            max_wait: None,
        }
    }
}

impl RateLimitConfig {
    /// Creates a new builder for configuring rate limit handling.
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// Creates a disabled rate limit configuration.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Applies `max_wait` to a server-requested delay.
    pub fn cap(&self, delay: Duration) -> Duration {
        match self.max_wait {
            Some(max_wait) => delay.min(max_wait),
            None => delay,
        }
    }
}

/// Builder for `RateLimitConfig`.
#[derive(Default)]
pub struct RateLimitConfigBuilder {
    enabled: Option<bool>,
    tries: Option<Tries>,
    max_wait: Option<Duration>,
}

impl RateLimitConfigBuilder {
    /// Sets whether rate limit handling is enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the try budget.
    pub fn tries(mut self, tries: Tries) -> Self {
        self.tries = Some(tries);
        self
    }

    /// Sets the maximum time to wait for a single rate limit.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Builds the `RateLimitConfig`.
    pub fn build(self) -> RateLimitConfig {
        let default = RateLimitConfig::default();
        RateLimitConfig {
            enabled: self.enabled.unwrap_or(default.enabled),
            tries: self.tries.unwrap_or(default.tries),
            max_wait: self.max_wait.or(default.max_wait),
        }
    }
}

/// Parses the Retry-After header.
///
/// Supports delay-seconds (integer or fractional) and HTTP-date formats.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get("retry-after")?.to_str().ok()?.trim();

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(seconds) = header.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }

    // A date in the past means "now".
    if let Ok(date_time) = httpdate::parse_http_date(header) {
        return Some(
            date_time
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO),
        );
    }

    None
}

/// Parses X-RateLimit-Reset or RateLimit-Reset headers (Unix timestamp).
fn parse_rate_limit_reset(headers: &HeaderMap) -> Option<SystemTime> {
    ["x-ratelimit-reset", "ratelimit-reset"]
        .iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok()?.parse::<u64>().ok())
        .map(|timestamp| UNIX_EPOCH + Duration::from_secs(timestamp))
        .next()
}

/// Parses X-RateLimit-Remaining header.
fn parse_rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    let header = headers.get("x-ratelimit-remaining")?.to_str().ok()?;
    header.parse().ok()
}
