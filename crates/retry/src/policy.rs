//! Provider-specific rate-limit detection.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{RetryConfig, RetryPolicy};

/// Read access to the parts of a failed HTTP exchange that carry
/// rate-limit signals.
pub trait HttpFailure {
    /// HTTP status, when the failure came from a response.
    fn status(&self) -> Option<u16>;

    /// Raw `retry-after` header value.
    fn retry_after(&self) -> Option<&str>;

    /// Raw `x-ratelimit-reset` header value (epoch seconds).
    fn rate_limit_reset(&self) -> Option<&str>;
}

/// Rate-limit policy of the document-management API.
///
/// Only 429 is retried. The wait prefers `retry-after` (seconds, may be
/// fractional), then the `x-ratelimit-reset` timestamp, then exponential
/// backoff.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentApiPolicy;

impl DocumentApiPolicy {
    /// Computes the wait for `err` as seen at `now`.
    pub fn delay_at<E: HttpFailure>(
        err: &E,
        attempt: u32,
        config: &RetryConfig,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        if err.status() != Some(429) {
            return None;
        }

        if let Some(delay) = err
            .retry_after()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs.max(0.0)).ok())
        {
            return Some(delay);
        }

        if let Some(reset) = err
            .rate_limit_reset()
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            let wait_ms = reset
                .saturating_mul(1000)
                .saturating_sub(now.timestamp_millis());
            return Some(Duration::from_millis(wait_ms.max(0) as u64));
        }

        Some(config.backoff_delay(attempt))
    }
}

impl<E: HttpFailure> RetryPolicy<E> for DocumentApiPolicy {
    fn rate_limit_delay(&self, err: &E, attempt: u32, config: &RetryConfig) -> Option<Duration> {
        Self::delay_at(err, attempt, config, Utc::now())
    }
}

/// Rate-limit policy of the storage API.
///
/// 429 and 503 are retried. The wait is `retry-after` in whole seconds when
/// present, otherwise exponential backoff.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoragePolicy;

impl<E: HttpFailure> RetryPolicy<E> for StoragePolicy {
    fn rate_limit_delay(&self, err: &E, attempt: u32, config: &RetryConfig) -> Option<Duration> {
        if !matches!(err.status(), Some(429 | 503)) {
            return None;
        }

        let delay = err
            .retry_after()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|secs| Duration::from_secs(secs.max(0) as u64))
            .unwrap_or_else(|| config.backoff_delay(attempt));
        Some(delay)
    }
}
