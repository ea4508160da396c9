use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::backoff::Backoff;

const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Bounded retry on rate-limit responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, the first one included.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Wait before the attempt following `attempt` (zero based). The server
    /// hint wins over the backoff schedule but never exceeds its cap.
    pub fn wait_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(self.backoff.max()),
            None => self.backoff.delay(attempt),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Backoff::default())
    }
}

/// Rate-limit classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitSignal {
    None,
    Limited { hint: Option<Duration> },
}

/// 429 is always a rate limit. 403 only counts when the quota headers or a
/// `Retry-After` say so; a plain 403 is a permission failure.
pub fn rate_limit_signal(status: StatusCode, headers: &HeaderMap, now: SystemTime) -> RateLimitSignal {
    let quota_exhausted = header_str(headers, RATELIMIT_REMAINING).is_some_and(|v| v.trim() == "0");
    let limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (quota_exhausted || headers.contains_key(RETRY_AFTER)));
    if !limited {
        return RateLimitSignal::None;
    }

    let hint = retry_after(headers, now).or_else(|| {
        quota_exhausted
            .then(|| reset_delay(headers, now))
            .flatten()
    });
    RateLimitSignal::Limited { hint }
}

fn retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let value = header_str(headers, RETRY_AFTER.as_str())?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(now).unwrap_or(Duration::ZERO))
}

fn reset_delay(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let reset = header_str(headers, RATELIMIT_RESET)?.trim().parse::<u64>().ok()?;
    let now_secs = now.duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(Duration::from_secs(reset.saturating_sub(now_secs)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
