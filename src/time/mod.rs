//! Monotonic time for scheduling decisions.
//!
//! The run queue never reads an ambient clock: every operation that stamps a
//! timestamp takes an explicit [`Instant`], which keeps selection decisions
//! deterministic and testable. [`TickClock`] is the intended production
//! source, incremented from the timer interrupt.

use portable_atomic::{AtomicU64, Ordering};

/// Default timer interrupt frequency in Hz.
pub const TICK_HZ: u32 = 1000;

/// Nanoseconds since an arbitrary monotonic epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(u64);

impl Instant {
    /// The epoch itself; the `last_ran` value of a task that never ran.
    pub const ZERO: Instant = Instant(0);

    /// Create an instant from nanoseconds since the epoch.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Nanoseconds since the epoch.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Duration elapsed since `earlier`, saturating at zero.
    pub fn duration_since(self, earlier: Instant) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl core::ops::Add<Duration> for Instant {
    type Output = Self;

    fn add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_nanos()))
    }
}

/// A span of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(u64);

impl Duration {
    /// Create a duration from nanoseconds.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create a duration from microseconds.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros * 1_000)
    }

    /// Create a duration from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Nanoseconds in this duration.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Microseconds in this duration.
    pub const fn as_micros(self) -> u64 {
        self.0 / 1_000
    }

    /// Milliseconds in this duration.
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }
}

/// Tick-driven monotonic clock.
///
/// Incremented on every timer interrupt; `now()` converts the tick count to
/// an [`Instant`] so all scheduling timestamps share one time base.
pub struct TickClock {
    ticks: AtomicU64,
    frequency: u32,
    ns_per_tick: u64,
}

impl TickClock {
    /// Create a clock driven at `frequency` Hz.
    pub const fn new(frequency: u32) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            frequency,
            ns_per_tick: 1_000_000_000 / frequency as u64,
        }
    }

    /// Advance the clock by one tick (timer interrupt handler only).
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }

    /// Ticks since the clock was created.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Tick frequency in Hz.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Current time.
    pub fn now(&self) -> Instant {
        Instant::from_nanos(self.ticks() * self.ns_per_tick)
    }
}
