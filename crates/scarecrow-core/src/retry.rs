//! Retry policy with exponential backoff
//!
//! A single [`RetryPolicy`] drives every remote listing, creation and update
//! call. Classification is a predicate supplied by the caller; for storage
//! calls it is [`is_retryable`], which accepts rate limiting and transient
//! server-side statuses only.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scarecrow_core::retry::{is_retryable, RetryPolicy};
//! # use scarecrow_core::ports::StorageError;
//! # async fn call() -> Result<u32, StorageError> { Ok(1) }
//!
//! # async fn example() -> Result<(), StorageError> {
//! let policy = RetryPolicy::default();
//! let value = policy.run("list", is_retryable, || call()).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::ports::StorageError;

/// HTTP statuses worth retrying: rate limited, and transient server-side failures
pub const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Default number of attempts, the first call included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Default upper bound for a single delay
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Returns true if `status` is in [`RETRYABLE_STATUS`]
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS.contains(&status)
}

/// Classification predicate for storage calls
///
/// Only errors carrying a retryable HTTP status are retried; authentication,
/// permission, not-found, bad-request, transport and local I/O failures
/// propagate on the first attempt.
pub fn is_retryable(err: &StorageError) -> bool {
    err.status().is_some_and(is_retryable_status)
}

// ============================================================================
// Backoff
// ============================================================================

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    /// Doubling delays starting at `base`, each capped at `max`
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    /// The same delay before every retry
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base: delay,
            max: delay,
        }
    }

    /// Delay before retry number `retry` (0 for the first retry)
    pub fn delay(&self, retry: u32) -> Duration {
        let base_ms = self.base.as_millis().min(u128::from(u64::MAX)) as u64;
        let max_ms = self.max.as_millis().min(u128::from(u64::MAX)) as u64;
        let shift = retry.min(16);
        Duration::from_millis(base_ms.saturating_mul(1u64 << shift).min(max_ms))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// Bounded retry loop around an async operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Backoff::default())
    }
}

impl RetryPolicy {
    /// Creates a policy making at most `max_attempts` calls (at least one)
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Maximum number of calls, the first one included
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The delay schedule
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Runs `operation` until it succeeds, fails with an error rejected by
    /// `is_retryable`, or the attempts are exhausted
    ///
    /// The last error is returned unchanged.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        name: &str,
        is_retryable: P,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation = name, attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    let delay = self.backoff.delay(attempt - 1);
                    warn!(
                        operation = name,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
