//! # Clocks
//!
//! Timestamps are nanosecond counts from a scene-chosen origin. The step
//! scheduler only ever compares and offsets them, so any monotonic source
//! works; tests drive time by hand with `ManualClock`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rewind_shared::NANOS_PER_SECOND;

/// A point on the simulation timeline, in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timeline origin.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from nanoseconds.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Nanoseconds since the origin.
    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Timestamp `nanos` later.
    #[inline]
    #[must_use]
    pub const fn offset(self, nanos: u64) -> Self {
        Self(self.0.saturating_add(nanos))
    }

    /// Timestamp `nanos` earlier, clamped at the origin.
    #[inline]
    #[must_use]
    pub const fn rewind(self, nanos: u64) -> Self {
        Self(self.0.saturating_sub(nanos))
    }

    /// Nanoseconds from `earlier` to `self`, zero if `earlier` is later.
    #[inline]
    #[must_use]
    pub const fn nanos_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Seconds from `earlier` to `self`, zero if `earlier` is later.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds_since(self, earlier: Self) -> f32 {
        (self.nanos_since(earlier) as f64 / NANOS_PER_SECOND as f64) as f32
    }
}

/// Source of the current time for a scene.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock based on `Instant`, with its origin at construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is now.
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
    fn now(&self) -> Timestamp {
        let nanos = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Timestamp::from_nanos(nanos)
    }
}

/// Hand-driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Creates a clock at `start`.
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            nanos: AtomicU64::new(start.as_nanos()),
        }
    }

    /// Jumps to `time`.
    pub fn set(&self, time: Timestamp) {
        self.nanos.store(time.as_nanos(), Ordering::Release);
    }

    /// Moves forward by `nanos`.
    pub fn advance(&self, nanos: u64) {
        self.nanos.fetch_add(nanos, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}
