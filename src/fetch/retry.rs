//! Failure classification, exponential backoff and jitter pauses.
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - may succeed on the next attempt
//! - [`FailureType::Permanent`] - retrying the same transport will not help
//! - [`FailureType::Unavailable`] - the transport cannot run on this host
//!
//! Only transient failures are retried within a transport; the other two
//! advance straight to the next transport.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use crate::transport::TransportError;

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: timeout, 403/429 bot walls, 5xx, wrong content type.
    Transient,

    /// Permanent failure for this URL on this transport.
    ///
    /// Examples: 404 Not Found, 410 Gone, invalid URL.
    Permanent,

    /// The transport itself cannot run (runtime missing, launch failure,
    /// operation not supported).
    Unavailable,
}

impl FailureType {
    #[must_use]
    pub fn is_retryable(self) -> bool {
        self == Self::Transient
    }
}

/// Exponential backoff schedule.
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1), max_delay)
/// ```
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Delay after the given 1-indexed failed attempt.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);

        // attempt 1 = base * 2^0
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);

        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

/// Uniform random pause in the given millisecond range.
#[must_use]
pub fn jitter(range_ms: &RangeInclusive<u64>) -> Duration {
    if range_ms.is_empty() {
        return Duration::ZERO;
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(range_ms.clone()))
}

/// Uniform random pause between two durations (order-insensitive).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn jitter_between(min: Duration, max: Duration) -> Duration {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    jitter(&(lo.as_millis() as u64..=hi.as_millis() as u64))
}

/// Classifies a transport error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HttpStatus | by status, see [`classify_http_status`] |
/// | Timeout, Network, ContentRejected, Browser, Io | Transient |
/// | InvalidUrl | Permanent |
/// | Unavailable, Unsupported | Unavailable |
#[instrument(level = "trace")]
pub fn classify_error(error: &TransportError) -> FailureType {
    let failure = match error {
        TransportError::HttpStatus { status, .. } => classify_http_status(*status),
        TransportError::Timeout { .. }
        | TransportError::Network { .. }
        | TransportError::ContentRejected { .. }
        | TransportError::Browser { .. }
        | TransportError::Io { .. } => FailureType::Transient,
        TransportError::InvalidUrl { .. } => FailureType::Permanent,
        TransportError::Unavailable { .. } | TransportError::Unsupported { .. } => {
            FailureType::Unavailable
        }
    };
    debug!(?failure, "classified transport error");
    failure
}

/// Classifies an HTTP status code.
///
/// 403 and 429 are transient here: bot walls and rate limits often clear
/// after a pause or with a different identity.
#[allow(clippy::match_same_arms)]
#[must_use]
pub fn classify_http_status(status: u16) -> FailureType {
    match status {
        400 => FailureType::Permanent, // Bad Request
        401 => FailureType::Permanent, // Unauthorized (no auth support)
        403 => FailureType::Transient, // Forbidden (often a bot wall)
        404 => FailureType::Permanent, // Not Found
        408 => FailureType::Transient, // Request Timeout
        410 => FailureType::Permanent, // Gone
        429 => FailureType::Transient, // Too Many Requests
        451 => FailureType::Permanent, // Unavailable For Legal Reasons

        status if (500..600).contains(&status) => FailureType::Transient,
        status if (400..500).contains(&status) => FailureType::Permanent,

        // 1xx/3xx surfacing as errors are unexpected; give them another go
        _ => FailureType::Transient,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = BackoffPolicy::new(Duration::from_millis(500), Duration::from_secs(3));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_secs(3));
        assert_eq!(policy.delay_for(30), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_attempt_zero_is_base() {
        let policy = BackoffPolicy::new(Duration::from_millis(250), Duration::from_secs(1));
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_zero_policy_never_waits() {
        let policy = BackoffPolicy::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.delay_for(5), Duration::ZERO);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..100 {
            let pause = jitter(&(100..=400));
            assert!(pause >= Duration::from_millis(100));
            assert!(pause <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_jitter_zero_range() {
        assert_eq!(jitter(&(0..=0)), Duration::ZERO);
        #[allow(clippy::reversed_empty_ranges)]
        let empty = 5..=1;
        assert_eq!(jitter(&empty), Duration::ZERO);
    }

    #[test]
    fn test_jitter_between_accepts_reversed_bounds() {
        let pause = jitter_between(Duration::from_millis(600), Duration::from_millis(200));
        assert!(pause >= Duration::from_millis(200));
        assert!(pause <= Duration::from_millis(600));
    }

    #[test]
    fn test_classify_http_status_table() {
        for status in [400, 404, 410, 451] {
            assert_eq!(classify_http_status(status), FailureType::Permanent, "{status}");
        }
        for status in [403, 408, 429, 500, 502, 503, 504] {
            assert_eq!(classify_http_status(status), FailureType::Transient, "{status}");
        }
    }

    #[test]
    fn test_classify_error_variants() {
        let url = "https://example.org/a.pdf";
        assert_eq!(
            classify_error(&TransportError::timeout(url)),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&TransportError::rejected(url, "text/html")),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&TransportError::http_status(url, 404)),
            FailureType::Permanent
        );
        assert_eq!(
            classify_error(&TransportError::unavailable("browser", "missing")),
            FailureType::Unavailable
        );
        assert_eq!(
            classify_error(&TransportError::unsupported("mirror", "fetch")),
            FailureType::Unavailable
        );
        assert!(!FailureType::Permanent.is_retryable());
        assert!(FailureType::Transient.is_retryable());
    }
}
