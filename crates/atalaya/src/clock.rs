//! Time source for polling loops.
//!
//! Every wait in Atalaya reads time and sleeps through a [`Clock`]. Real runs
//! use [`SystemClock`]; tests use [`FakeClock`], whose `sleep` advances virtual
//! time instantly so a 12 second timeout costs nothing.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source with a blocking sleep
pub trait Clock: Debug + Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for deterministic tests
#[derive(Debug, Default)]
pub struct FakeClock {
    /// Current virtual time in nanoseconds
    now_ns: AtomicU64,
    /// Number of `sleep` calls observed
    sleeps: AtomicU64,
}

impl FakeClock {
    /// Create a clock at time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward
    pub fn advance(&self, duration: Duration) {
        let _ = self
            .now_ns
            .fetch_add(saturating_nanos(duration), Ordering::SeqCst);
    }

    /// Number of sleeps performed so far
    #[must_use]
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        let _ = self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
