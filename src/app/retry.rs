//! Linear retry policy shared by detail fetches and lookups
//!
//! Attempt `n` that fails is followed by a pause of `n * base_delay`, up to
//! `max_attempts` attempts in total. The schedule is expressed as a
//! [`backoff::backoff::Backoff`] so it composes with the rest of the backoff
//! ecosystem; the loop that drives it sleeps on the tokio timer.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::limits;

/// How many times to try and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay unit; the wait after failure `n` is `n * base_delay`
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_ATTEMPTS,
            base_delay: limits::RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// A fresh backoff schedule for one operation
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.max_attempts, self.base_delay)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("Retry policy needs at least one attempt".to_string());
        }
        Ok(())
    }
}

/// Backoff whose delay grows by `base` after every failure
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    max_attempts: u32,
    base: Duration,
    failures: u32,
}

impl LinearBackoff {
    pub fn new(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            base,
            failures: 0,
        }
    }

    /// Failures recorded so far
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.failures = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.max_attempts {
            None
        } else {
            Some(self.base * self.failures)
        }
    }
}

/// The last error once the retry budget is spent
#[derive(Debug)]
pub struct Exhausted<E> {
    pub error: E,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, `should_retry` rejects the error, or the
/// policy runs out of attempts
pub async fn retry_with<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut backoff = policy.backoff();
    loop {
        let attempt = backoff.failures() + 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !should_retry(&error) {
                    return Err(Exhausted { error, attempts: attempt });
                }
                match backoff.next_backoff() {
                    Some(delay) => {
                        debug!(
                            "Attempt {}/{} failed, retrying in {:?}",
                            attempt, policy.max_attempts, delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(Exhausted { error, attempts: attempt }),
                }
            }
        }
    }
}
