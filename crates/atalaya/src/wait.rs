//! Wait options and the bounded polling loop.
//!
//! All element waits share one loop: try, and if the condition is not met,
//! sleep `poll_interval` and try again until `timeout` has elapsed. A
//! condition that never holds returns after at least `timeout` and at most
//! `timeout + poll_interval` (plus the cost of the last attempt).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::clock::Clock;
use crate::result::UiResult;

/// Default timeout for element waits (12 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 12_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default timeout for the settle barrier (30 seconds)
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 30_000;

/// Lower bound applied to the poll interval so a zero interval cannot spin
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Options for element waits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Options for the settle barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SETTLE_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SettleOptions {
    /// Create new settle options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Same bounds expressed as [`WaitOptions`]
    #[must_use]
    pub const fn as_wait(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

/// Poll `attempt` until it yields a value or the timeout elapses.
///
/// `Ok(None)` from `attempt` means "not yet"; an `Err` ends the loop and is
/// returned as is. Running out of time is `Ok(None)`, never an error.
pub fn poll_until<T, F>(clock: &dyn Clock, options: &WaitOptions, mut attempt: F) -> UiResult<Option<T>>
where
    F: FnMut() -> UiResult<Option<T>>,
{
    let start = clock.now();
    let timeout = options.timeout();
    let interval = options.poll_interval().max(MIN_POLL_INTERVAL);
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);
        if let Some(value) = attempt()? {
            tracing::trace!(attempts, "wait condition met");
            return Ok(Some(value));
        }

        let elapsed = clock.now().saturating_sub(start);
        if elapsed >= timeout {
            tracing::trace!(attempts, elapsed_ms = elapsed.as_millis() as u64, "wait timed out");
            return Ok(None);
        }
        clock.sleep(interval.min(timeout - elapsed));
    }
}

/// Poll a boolean predicate; `Ok(true)` once it holds, `Ok(false)` on timeout
pub fn poll_predicate<F>(clock: &dyn Clock, options: &WaitOptions, mut predicate: F) -> UiResult<bool>
where
    F: FnMut() -> UiResult<bool>,
{
    let outcome = poll_until(clock, options, || Ok(predicate()?.then_some(())))?;
    Ok(outcome.is_some())
}
