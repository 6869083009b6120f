//! Bounded retry of outbound requests on provider rate limits.
//!
//! [`execute`] wraps a single outbound call. Whether a failure is a rate
//! limit, and how long to wait before the next attempt, is decided by a
//! caller-supplied [`RetryPolicy`]. Two policies ship with the crate:
//! [`DocumentApiPolicy`] for the document-management API and
//! [`StoragePolicy`] for the storage API.

mod policy;

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

pub use policy::{DocumentApiPolicy, HttpFailure, StoragePolicy};

/// Retry budget and backoff seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay of the first exponential backoff step.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Budget for calls on the migration path.
    pub fn critical() -> Self {
        Self {
            max_retries: 8,
            ..Self::default()
        }
    }

    /// Exponential backoff for a 0-based attempt: `base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Decides whether a failure is a rate limit and how long to wait.
pub trait RetryPolicy<E> {
    /// Returns the wait before the next attempt, or `None` when `err` must
    /// propagate immediately. `attempt` is the 0-based retry index.
    fn rate_limit_delay(&self, err: &E, attempt: u32, config: &RetryConfig) -> Option<Duration>;
}

impl<E, F> RetryPolicy<E> for F
where
    F: Fn(&E, u32, &RetryConfig) -> Option<Duration>,
{
    fn rate_limit_delay(&self, err: &E, attempt: u32, config: &RetryConfig) -> Option<Duration> {
        self(err, attempt, config)
    }
}

/// Runs `op`, retrying rate-limited failures per `policy`.
///
/// Returns the first success, the first non-rate-limit error, or the last
/// rate-limit error once `config.max_retries` retries have been spent.
pub async fn execute<T, E, P, F, Fut>(
    label: &str,
    config: &RetryConfig,
    policy: &P,
    mut op: F,
) -> Result<T, E>
where
    P: RetryPolicy<E> + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= config.max_retries {
            return Err(err);
        }

        let Some(delay) = policy.rate_limit_delay(&err, attempt, config) else {
            return Err(err);
        };

        warn!(
            request = label,
            attempt = attempt + 1,
            max_retries = config.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "rate limited, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
