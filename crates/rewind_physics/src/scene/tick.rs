//! Live stepping: the fixed-timestep loop, the per-tick body shared with
//! replay, and presentation write-back.

use super::{FlagGuard, PhysicsScene, StepState, STEPPING};
use crate::clock::Timestamp;
use crate::engine::PhysicsEngine;
use crate::scheduler::StepScheduler;
use crate::snapshot::capture_state;
use crate::writeback::publish_active;

/// Whether a tick belongs to the live timeline or a rollback replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum TickMode {
    /// Flushes the command stage and forwards contacts.
    Live,
    /// Steps only; queued work waits for the next live tick.
    Replay,
}

impl<E: PhysicsEngine> PhysicsScene<E> {
    /// Runs every tick owed at the clock's current time, then publishes
    /// awake bodies. Template scenes never step.
    pub fn step(&self) {
        if self.config.is_template {
            return;
        }
        let mut guard = self.step.lock();
        let _stepping = FlagGuard::raise(&self.flags, STEPPING);
        let mut engine = self.engine.lock();
        let StepState {
            scheduler,
            history,
            active,
            ..
        } = &mut *guard;

        let now = self.clock.now();
        scheduler.begin_frame(now);
        while scheduler.is_tick_due(now) {
            let entry = history.emplace(scheduler.next_tick());
            capture_state(&*engine, &mut entry.recorder);
            self.tick(&mut *engine, scheduler, TickMode::Live);
        }

        let leftover = self.presentation_seconds(scheduler, now);
        publish_active(&*engine, &*self.sink, leftover, active);
    }

    /// Flushes the command stage, then steps. The per-frame job order.
    pub fn run_frame(&self) {
        self.flush_commands();
        self.step();
    }

    /// Applies every queued mutation without stepping. This is how template
    /// scenes receive their bodies.
    pub fn flush_commands(&self) {
        let _guard = self.step.lock();
        let mut engine = self.engine.lock();
        let report = self.stage.flush(&mut *engine, &self.dispatch_context());
        self.release_constraints(&report.removed_constraints);
    }

    /// One tick: flush (live only), engine step unless every body sleeps,
    /// then advance the timeline.
    pub(super) fn tick(&self, engine: &mut E, scheduler: &mut StepScheduler, mode: TickMode) {
        if mode == TickMode::Live {
            let report = self.stage.flush(engine, &self.dispatch_context());
            self.release_constraints(&report.removed_constraints);
        }

        if engine.num_active_bodies() > 0 {
            let mut listener = self.contacts.forwarder(
                scheduler.tick_count(),
                mode == TickMode::Replay,
                self.config.forward_persisted_contacts,
            );
            engine.step(
                scheduler.tick_seconds(),
                self.collision_steps,
                self.config.integration_steps,
                &mut listener,
            );
        } else {
            scheduler.record_idle();
        }
        scheduler.advance();
    }

    /// Extrapolation time for write-back.
    pub(super) fn presentation_seconds(&self, scheduler: &StepScheduler, now: Timestamp) -> f32 {
        if self.config.interpolate_presentation {
            scheduler.leftover_seconds(now)
        } else {
            0.0
        }
    }
}
