//! Bounded retry with incremental backoff

use log::{error, warn};
use std::time::Duration;

use crate::error::{SyncError, SyncResult};

/// Blocks between retry attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// How often and how patiently a fetch is retried
///
/// Retry `n` (starting at 1) waits `n * delay_step`, so the default policy
/// waits 5s, 10s, 15s, 20s and 25s before giving up after 6 attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay_step: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 5;
    pub const DEFAULT_DELAY_STEP: Duration = Duration::from_secs(5);

    pub fn new(max_retries: u32, delay_step: Duration) -> Self {
        Self {
            max_retries,
            delay_step,
        }
    }

    /// Delay before the given retry (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.delay_step.saturating_mul(retry)
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Run `attempt` until it succeeds or the retry bound is exceeded
    ///
    /// Only retryable errors ([`SyncError::RemoteFetch`]) are retried; any
    /// other error is returned immediately. Exhaustion yields
    /// [`SyncError::RetriesExhausted`] carrying the last failure.
    pub fn run<T, F>(&self, target: &str, sleeper: &dyn Sleeper, mut attempt: F) -> SyncResult<T>
    where
        F: FnMut() -> SyncResult<T>,
    {
        let mut retries = 0;

        loop {
            let err = match attempt() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            if retries >= self.max_retries {
                error!("Cannot fetch {target} due to previous errors, giving up: {err}");
                return Err(SyncError::RetriesExhausted {
                    target: target.to_string(),
                    attempts: retries + 1,
                    source: Box::new(err),
                });
            }

            retries += 1;
            let delay = self.delay_for(retries);
            warn!(
                "Cannot update entities: {err} (retries={retries}/{}, waiting {}s)",
                self.max_retries,
                delay.as_secs()
            );
            sleeper.sleep(delay);
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_DELAY_STEP)
    }
}
