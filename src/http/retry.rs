//! Retry with exponential backoff over well-formed failure responses.

use anyhow::Result;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

use super::NetworkResponse;

/// Statuses treated as transient when a policy does not name its own:
/// request timeout, rate limit, and server-side failures.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// How a failing call is retried.
///
/// Total attempts are at most `1 + max_retries`. The delay before retry
/// `k` (0-based) is `base_delay_ms * 2^k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Statuses worth retrying. `None` means [`DEFAULT_RETRYABLE_STATUSES`].
    pub retryable_statuses: Option<Vec<u16>>,
    /// Whether a transport error (no response at all) also consumes
    /// attempts. Off by default: such errors propagate on first sight.
    pub retry_transport_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY_MS)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            retryable_statuses: None,
            retry_transport_errors: false,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn with_retryable_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retryable_statuses = Some(statuses.into());
        self
    }

    pub fn with_transport_error_retry(mut self, enabled: bool) -> Self {
        self.retry_transport_errors = enabled;
        self
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        match &self.retryable_statuses {
            Some(statuses) => statuses.contains(&status),
            None => DEFAULT_RETRYABLE_STATUSES.contains(&status),
        }
    }

    /// Delay before retry number `attempt` (0 for the first retry).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Runs `operation` and retries it according to `policy`.
///
/// A response that is `ok`, or whose status is outside the retryable set,
/// is returned as is. Once retries are exhausted the last failing response
/// is returned, so callers handle it exactly like a first-attempt failure.
/// An `Err` from the transport propagates immediately unless the policy
/// opts into retrying transport errors.
pub async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<NetworkResponse>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<NetworkResponse>>,
{
    let mut attempt: u32 = 0;

    loop {
        let delay = match operation().await {
            Ok(response) => {
                if response.ok || !policy.is_retryable(response.status) {
                    return Ok(response);
                }
                if attempt >= policy.max_retries {
                    if policy.max_retries > 0 {
                        warn!(
                            "{}: giving up after {} attempts (HTTP {})",
                            operation_name,
                            attempt + 1,
                            response.status
                        );
                    }
                    return Ok(response);
                }
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "{}: attempt {}/{} failed (HTTP {}), retrying in {}ms...",
                    operation_name,
                    attempt + 1,
                    policy.max_retries + 1,
                    response.status,
                    delay.as_millis()
                );
                delay
            }
            Err(e) => {
                if !policy.retry_transport_errors {
                    debug!("{}: transport error, not retrying: {}", operation_name, e);
                    return Err(e);
                }
                if attempt >= policy.max_retries {
                    return Err(e);
                }
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                    operation_name,
                    attempt + 1,
                    policy.max_retries + 1,
                    e,
                    delay.as_millis()
                );
                delay
            }
        };

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
