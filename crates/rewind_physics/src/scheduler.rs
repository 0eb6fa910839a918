//! # Step Scheduler
//!
//! Fixed-timestep accumulator with a bounded catch-up.
//!
//! ## Design
//!
//! The scheduler only tracks time; the scene drives the tick body. Each
//! frame:
//! - owed time is clamped so at most `max_ticks_per_frame` ticks are due
//! - ticks run while `now - next_tick >= tick_duration`
//! - the leftover `now - next_tick` is used for presentation extrapolation

use crate::clock::Timestamp;

/// Counters kept across frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// `step()` calls.
    pub frames: u64,
    /// Ticks executed (live timeline only).
    pub ticks: u64,
    /// Ticks that found every body asleep and skipped the engine.
    pub idle_ticks: u64,
    /// Ticks discarded by the catch-up bound.
    pub dropped_ticks: u64,
}

/// Fixed-timestep tick controller.
#[derive(Clone, Debug)]
pub struct StepScheduler {
    tick_duration: u64,
    max_ticks_per_frame: u32,
    next_tick: Timestamp,
    tick_count: u64,
    stats: SchedulerStats,
}

impl StepScheduler {
    /// Creates a scheduler whose first tick starts at `start`.
    #[must_use]
    pub fn new(tick_duration_nanos: u64, max_ticks_per_frame: u32, start: Timestamp) -> Self {
        Self {
            tick_duration: tick_duration_nanos.max(1),
            max_ticks_per_frame: max_ticks_per_frame.max(1),
            next_tick: start,
            tick_count: 0,
            stats: SchedulerStats::default(),
        }
    }

    /// Tick duration in nanoseconds.
    #[must_use]
    pub const fn tick_duration(&self) -> u64 {
        self.tick_duration
    }

    /// Tick duration in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tick_seconds(&self) -> f32 {
        (self.tick_duration as f64 / rewind_shared::NANOS_PER_SECOND as f64) as f32
    }

    /// Start time of the next tick.
    #[must_use]
    pub const fn next_tick(&self) -> Timestamp {
        self.next_tick
    }

    /// Start time of the most recent tick.
    #[must_use]
    pub const fn previous_tick(&self) -> Timestamp {
        self.next_tick.rewind(self.tick_duration)
    }

    /// Ticks executed on the live timeline.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Starts a frame: drops owed time beyond the catch-up bound.
    ///
    /// Returns the number of ticks dropped.
    pub fn begin_frame(&mut self, now: Timestamp) -> u64 {
        self.stats.frames += 1;
        let window = self.tick_duration * u64::from(self.max_ticks_per_frame);
        let earliest = now.rewind(window);
        if self.next_tick >= earliest {
            return 0;
        }

        let dropped = earliest.nanos_since(self.next_tick) / self.tick_duration;
        tracing::warn!(
            dropped,
            max_ticks = self.max_ticks_per_frame,
            "physics fell behind, dropping owed ticks"
        );
        self.next_tick = earliest;
        self.stats.dropped_ticks += dropped;
        dropped
    }

    /// Whether a full tick is owed at `now`.
    #[must_use]
    pub const fn is_tick_due(&self, now: Timestamp) -> bool {
        now.nanos_since(self.next_tick) >= self.tick_duration
    }

    /// Completes a tick.
    pub fn advance(&mut self) {
        self.next_tick = self.next_tick.offset(self.tick_duration);
        self.tick_count += 1;
        self.stats.ticks += 1;
    }

    /// Records a tick that skipped the engine.
    pub fn record_idle(&mut self) {
        self.stats.idle_ticks += 1;
    }

    /// Seconds past the next tick boundary at `now`, for extrapolation.
    #[must_use]
    pub fn leftover_seconds(&self, now: Timestamp) -> f32 {
        now.seconds_since(self.next_tick)
    }

    /// Moves the timeline back to `timestamp` for replay.
    ///
    /// The tick count moves back by the whole ticks rewound; replay ticks
    /// advance it again, so a completed replay leaves it unchanged.
    pub fn rewind_to(&mut self, timestamp: Timestamp) {
        let ticks = self.next_tick.nanos_since(timestamp) / self.tick_duration;
        self.tick_count = self.tick_count.saturating_sub(ticks);
        self.stats.ticks = self.stats.ticks.saturating_sub(ticks);
        self.next_tick = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: u64 = 1_000;

    fn run_frame(s: &mut StepScheduler, now: u64) -> u64 {
        let now = Timestamp::from_nanos(now);
        s.begin_frame(now);
        let mut ticks = 0;
        while s.is_tick_due(now) {
            s.advance();
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn test_ticks_due() {
        let mut s = StepScheduler::new(DT, 16, Timestamp::ZERO);
        assert_eq!(run_frame(&mut s, 500), 0);
        assert_eq!(run_frame(&mut s, 1_000), 1);
        assert_eq!(run_frame(&mut s, 5_500), 4);
        assert_eq!(s.tick_count(), 5);
        assert_eq!(s.next_tick(), Timestamp::from_nanos(5_000));
        assert_eq!(s.previous_tick(), Timestamp::from_nanos(4_000));
    }

    #[test]
    fn test_catch_up_bound() {
        let mut s = StepScheduler::new(DT, 16, Timestamp::ZERO);
        let ticks = run_frame(&mut s, 100 * DT);
        assert_eq!(ticks, 16);
        assert_eq!(s.stats().dropped_ticks, 84);
        assert_eq!(s.next_tick(), Timestamp::from_nanos(100 * DT));
    }

    #[test]
    fn test_leftover_is_below_one_tick() {
        let mut s = StepScheduler::new(DT, 16, Timestamp::ZERO);
        run_frame(&mut s, 3_250);
        let leftover = s.leftover_seconds(Timestamp::from_nanos(3_250));
        assert!((leftover - 250e-9).abs() < 1e-9);
    }

    #[test]
    fn test_rewind_then_replay_restores_count() {
        let mut s = StepScheduler::new(DT, 16, Timestamp::ZERO);
        run_frame(&mut s, 5_000);
        let before = (s.next_tick(), s.tick_count());

        s.rewind_to(Timestamp::from_nanos(2_000));
        assert_eq!(s.tick_count(), 2);
        for _ in 0..3 {
            s.advance();
        }
        assert_eq!((s.next_tick(), s.tick_count()), before);
    }
}
