//! # Rollback and Resimulation
//!
//! ```text
//!   history:  [t0] [t1] [t2] [t3] [t4]        next_tick = t5
//!                         ▲
//!   roll_back_and_tick(t2):
//!     scratch ◄── present state
//!     restore t2, sleep everything, wake the rolled-back set
//!     replay t2, t3, t4                       next_tick = t5 again
//!     capture rolled-back bodies ──┐
//!     present ◄── scratch          │
//!     apply captured states ◄──────┘
//! ```
//!
//! Bodies outside the rolled-back set end bit-identical to before the call.
//! Any failure restores the scratch snapshot and the scheduler.

use rewind_core::BodyHandle;
use rewind_shared::{Quaternion, Vec3};

use super::tick::TickMode;
use super::{FlagGuard, PhysicsScene, StepState, ROLLING_BACK};
use crate::body::{Activation, BodyState};
use crate::clock::Timestamp;
use crate::engine::PhysicsEngine;
use crate::error::{RollbackError, RollbackResult};
use crate::history::HistoryRing;
use crate::recorder::StateRecorder;
use crate::scheduler::StepScheduler;
use crate::snapshot::{capture_state, restore_state};
use crate::writeback::publish;

/// Replayed outcome of one rolled-back body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RolledBackState {
    /// Body handle.
    pub handle: BodyHandle,
    /// World position after replay.
    pub position: Vec3,
    /// World rotation after replay.
    pub rotation: Quaternion,
    /// Linear velocity after replay.
    pub linear_velocity: Vec3,
    /// Angular velocity after replay.
    pub angular_velocity: Vec3,
}

impl From<BodyState> for RolledBackState {
    fn from(state: BodyState) -> Self {
        Self {
            handle: state.handle,
            position: state.position,
            rotation: state.rotation,
            linear_velocity: state.linear_velocity,
            angular_velocity: state.angular_velocity,
        }
    }
}

/// Finds the entry a rollback to `timestamp` starts from. It must be
/// strictly older than the most recent tick.
fn eligible_entry(history: &HistoryRing, scheduler: &StepScheduler, timestamp: Timestamp) -> RollbackResult<usize> {
    let out_of_window = RollbackError::OutOfWindow { requested: timestamp };
    let pos = history.find_at_or_before(timestamp).ok_or(out_of_window)?;
    match history.get(pos) {
        Some(entry) if entry.timestamp < scheduler.previous_tick() => Ok(pos),
        _ => Err(out_of_window),
    }
}

/// Puts the present back after a failed attempt.
fn abandon<E: PhysicsEngine>(
    engine: &mut E,
    scratch: &mut StateRecorder,
    scheduler: &mut StepScheduler,
    saved: StepScheduler,
) {
    if let Err(err) = restore_state(engine, scratch) {
        tracing::error!(%err, "failed to restore pre-rollback state");
    }
    *scheduler = saved;
}

impl<E: PhysicsEngine> PhysicsScene<E> {
    /// Corrects the marked bodies by replaying from `timestamp` to now.
    ///
    /// Returns `false`, with no effect on the simulation, when the target is
    /// outside the retained window or the replay cannot run. The marked set
    /// is consumed either way.
    pub fn roll_back_and_tick(&self, timestamp: Timestamp) -> bool {
        self.try_roll_back_and_tick(timestamp).is_ok()
    }

    /// [`Self::roll_back_and_tick`] with the failure reason. On success
    /// returns the number of ticks replayed.
    pub fn try_roll_back_and_tick(&self, timestamp: Timestamp) -> RollbackResult<u64> {
        if self.config.is_template {
            self.rolled_back.lock().clear();
            return Err(RollbackError::TemplateScene);
        }
        let mut guard = self.step.lock();
        let marked = self.rolled_back.lock().take();
        let _rolling_back = FlagGuard::raise(&self.flags, ROLLING_BACK);
        let mut engine = self.engine.lock();

        let result = self.roll_back_locked(&mut *engine, &mut guard, timestamp, &marked);
        match &result {
            Ok(replayed) => tracing::debug!(
                target_time = timestamp.as_nanos(),
                replayed,
                bodies = marked.len(),
                "rollback complete"
            ),
            Err(err) => tracing::debug!(target_time = timestamp.as_nanos(), %err, "rollback failed"),
        }
        result
    }

    fn roll_back_locked(
        &self,
        engine: &mut E,
        state: &mut StepState,
        timestamp: Timestamp,
        marked: &[BodyHandle],
    ) -> RollbackResult<u64> {
        let StepState {
            scheduler,
            history,
            scratch,
            ..
        } = state;

        let pos = eligible_entry(history, scheduler, timestamp)?;
        capture_state(&*engine, scratch);
        let saved = scheduler.clone();

        let Some(entry) = history.get_mut(pos) else {
            return Err(RollbackError::OutOfWindow { requested: timestamp });
        };
        scheduler.rewind_to(entry.timestamp);
        if let Err(err) = restore_state(engine, &mut entry.recorder) {
            abandon(engine, scratch, scheduler, saved);
            return Err(err.into());
        }

        // Snapshots carry activation, so selective waking follows the restore.
        let live: Vec<BodyHandle> = marked.iter().copied().filter(|&h| engine.contains_body(h)).collect();
        engine.deactivate_all_bodies();
        if !live.is_empty() {
            engine.activate_bodies(&live);
        }

        let mut replayed = 0u64;
        for pos in pos..history.len() {
            let found = history.get(pos).map_or(Timestamp::ZERO, |entry| entry.timestamp);
            let expected = scheduler.next_tick();
            if found != expected {
                abandon(engine, scratch, scheduler, saved);
                return Err(RollbackError::Desync { expected, found });
            }
            self.tick(engine, scheduler, TickMode::Replay);
            replayed += 1;
        }

        let merged: Vec<RolledBackState> = live
            .iter()
            .filter_map(|&handle| engine.body_state(handle))
            .filter(|body| !body.is_kinematic())
            .map(RolledBackState::from)
            .collect();

        if let Err(err) = restore_state(engine, scratch) {
            tracing::error!(%err, "failed to restore present state after replay");
            *scheduler = saved;
            return Err(err.into());
        }
        // Replay ticks re-advanced the timeline; keep the counters as they were.
        *scheduler = saved;

        let leftover = self.presentation_seconds(scheduler, self.clock.now());
        for body in &merged {
            engine.set_position_and_rotation(body.handle, body.position, body.rotation, Activation::DontActivate);
            engine.set_linear_and_angular_velocity(body.handle, body.linear_velocity, body.angular_velocity);
            if let Some(state) = engine.body_state(body.handle) {
                publish(&*self.sink, &state, leftover);
            }
        }
        Ok(replayed)
    }

    /// Restores the state at `timestamp`, hands the engine to `visit`, and
    /// restores the present afterwards. When `visit` returns `true` its
    /// changes are written back into that history entry.
    ///
    /// Returns `false` when no eligible entry could be restored.
    pub fn rollback_and_visit(&self, timestamp: Timestamp, visit: impl FnOnce(&mut E) -> bool) -> bool {
        self.try_rollback_and_visit(timestamp, visit).is_ok()
    }

    /// [`Self::rollback_and_visit`] with the failure reason. On success
    /// returns whether the history entry was rewritten.
    pub fn try_rollback_and_visit(
        &self,
        timestamp: Timestamp,
        visit: impl FnOnce(&mut E) -> bool,
    ) -> RollbackResult<bool> {
        if self.config.is_template {
            return Err(RollbackError::TemplateScene);
        }
        let mut guard = self.step.lock();
        let _rolling_back = FlagGuard::raise(&self.flags, ROLLING_BACK);
        let mut engine = self.engine.lock();
        let StepState {
            scheduler,
            history,
            scratch,
            ..
        } = &mut *guard;

        let pos = eligible_entry(history, scheduler, timestamp)?;
        let Some(entry) = history.get_mut(pos) else {
            return Err(RollbackError::OutOfWindow { requested: timestamp });
        };
        capture_state(&*engine, scratch);

        if let Err(err) = restore_state(&mut *engine, &mut entry.recorder) {
            if let Err(undo) = restore_state(&mut *engine, scratch) {
                tracing::error!(%undo, "failed to restore pre-visit state");
            }
            tracing::debug!(target_time = timestamp.as_nanos(), %err, "visit failed");
            return Err(err.into());
        }

        let rewritten = visit(&mut *engine);
        if rewritten {
            capture_state(&*engine, &mut entry.recorder);
        }

        if let Err(err) = restore_state(&mut *engine, scratch) {
            tracing::error!(%err, "failed to restore present state after visit");
            return Err(err.into());
        }
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rewind_core::BodyHandle;
    use rewind_shared::Vec3;

    use super::*;
    use crate::body::BodySettings;
    use crate::clock::ManualClock;
    use crate::config::SceneConfig;
    use crate::test_support::RecordingEngine;
    use crate::writeback::RecordingSink;

    const TICK: u64 = 1_000_000_000 / 60;

    struct Fixture {
        scene: PhysicsScene<RecordingEngine>,
        clock: Arc<ManualClock>,
        sink: Arc<RecordingSink>,
        a: BodyHandle,
        b: BodyHandle,
    }

    fn moving_body(scene: &PhysicsScene<RecordingEngine>, owner: u64) -> BodyHandle {
        let handle = scene.register_body();
        let mut settings = BodySettings::dynamic(Vec3::ZERO);
        settings.linear_velocity = Vec3::X;
        scene.create_body(handle, settings, owner);
        scene.add_body(handle);
        handle
    }

    /// Two bodies moving along +x, five ticks run.
    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
        let sink = Arc::new(RecordingSink::new());
        let scene = PhysicsScene::builder(RecordingEngine::default())
            .config(SceneConfig::default())
            .clock(clock.clone())
            .sink(sink.clone())
            .build()
            .unwrap();
        let a = moving_body(&scene, 1);
        let b = moving_body(&scene, 2);
        clock.advance(TICK * 5);
        scene.step();
        Fixture {
            scene,
            clock,
            sink,
            a,
            b,
        }
    }

    fn snapshot(scene: &PhysicsScene<RecordingEngine>) -> Vec<u8> {
        scene.with_engine(|engine| {
            let mut rec = StateRecorder::new();
            capture_state(engine, &mut rec);
            rec.as_bytes().to_vec()
        })
    }

    fn state(scene: &PhysicsScene<RecordingEngine>, handle: BodyHandle) -> BodyState {
        scene.with_engine(|engine| engine.body_state(handle).unwrap())
    }

    #[test]
    fn test_empty_set_rollback_is_noop() {
        let f = fixture();
        let before = snapshot(&f.scene);
        let (ticks, next) = (f.scene.tick_count(), f.scene.next_tick_time());

        let replayed = f.scene.try_roll_back_and_tick(Timestamp::from_nanos(TICK * 2)).unwrap();

        assert_eq!(replayed, 3);
        assert_eq!(f.scene.tick_count(), ticks);
        assert_eq!(f.scene.next_tick_time(), next);
        assert_eq!(snapshot(&f.scene), before);
        assert!(!f.scene.is_rolling_back());
    }

    #[test]
    fn test_marked_body_takes_replayed_trajectory() {
        let f = fixture();
        let b_before = state(&f.scene, f.b);
        let t2 = Timestamp::from_nanos(TICK * 2);

        // Amend the past: `a` was moving along +z at t2.
        let a = f.a;
        assert!(f.scene.rollback_and_visit(t2, |engine| {
            engine.set_linear_velocity(a, Vec3::Z);
            true
        }));

        f.scene.mark_body_for_rollback(a);
        f.sink.clear();
        assert!(f.scene.roll_back_and_tick(t2));

        let dt = 1.0 / 60.0;
        let a_after = state(&f.scene, a);
        assert!((a_after.position.x - 2.0 * dt).abs() < 1e-5);
        assert!((a_after.position.z - 3.0 * dt).abs() < 1e-5);
        assert_eq!(a_after.linear_velocity, Vec3::Z);
        assert_eq!(state(&f.scene, f.b), b_before);
        assert!(f.sink.get(1).is_some());
        assert!(f.sink.get(2).is_none());
        assert!(f.scene.rollback_set().is_empty());
    }

    #[test]
    fn test_out_of_window_targets() {
        let f = fixture();
        let before = snapshot(&f.scene);
        f.scene.mark_body_for_rollback(f.a);

        // Newest entry is the last tick itself, so it is not eligible.
        let err = f.scene.try_roll_back_and_tick(Timestamp::from_nanos(TICK * 4)).unwrap_err();
        assert!(matches!(err, RollbackError::OutOfWindow { .. }));
        assert!(f.scene.rollback_set().is_empty());

        // Older than anything retained.
        let config = SceneConfig {
            history_capacity: 2,
            ..SceneConfig::default()
        };
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
        let small = PhysicsScene::builder(RecordingEngine::default())
            .config(config)
            .clock(clock.clone())
            .build()
            .unwrap();
        clock.advance(TICK * 5);
        small.step();
        assert!(!small.roll_back_and_tick(Timestamp::ZERO));

        assert_eq!(snapshot(&f.scene), before);
    }

    #[test]
    fn test_failed_restore_leaves_present_untouched() {
        let f = fixture();
        // A body born after the history was recorded makes old entries unrestorable.
        moving_body(&f.scene, 3);
        f.clock.advance(TICK);
        f.scene.step();
        let before = snapshot(&f.scene);
        let ticks = f.scene.tick_count();

        let err = f.scene.try_roll_back_and_tick(Timestamp::from_nanos(TICK)).unwrap_err();

        assert!(matches!(err, RollbackError::Restore(_)));
        assert_eq!(snapshot(&f.scene), before);
        assert_eq!(f.scene.tick_count(), ticks);
    }

    #[test]
    fn test_history_gap_is_desync() {
        let config = SceneConfig {
            max_ticks_per_frame: 2,
            ..SceneConfig::default()
        };
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
        let scene = PhysicsScene::builder(RecordingEngine::default())
            .config(config)
            .clock(clock.clone())
            .build()
            .unwrap();
        moving_body(&scene, 1);

        clock.advance(TICK * 2);
        scene.step();
        // A stall: the catch-up bound drops ticks and leaves a gap.
        clock.advance(TICK * 10);
        scene.step();
        let before = snapshot(&scene);
        let next = scene.next_tick_time();

        let err = scene.try_roll_back_and_tick(Timestamp::ZERO).unwrap_err();
        assert_eq!(
            err,
            RollbackError::Desync {
                expected: Timestamp::from_nanos(TICK * 2),
                found: Timestamp::from_nanos(TICK * 10),
            }
        );
        assert_eq!(snapshot(&scene), before);
        assert_eq!(scene.next_tick_time(), next);
    }

    #[test]
    fn test_visit_without_changes_keeps_history() {
        let f = fixture();
        let before = snapshot(&f.scene);
        let a = f.a;
        let mut seen = None;

        let rewritten = f
            .scene
            .try_rollback_and_visit(Timestamp::from_nanos(TICK * 3), |engine| {
                seen = engine.body_state(a).map(|s| s.position);
                false
            })
            .unwrap();

        assert!(!rewritten);
        let dt = 1.0 / 60.0;
        assert!((seen.unwrap().x - 3.0 * dt).abs() < 1e-5);
        assert_eq!(snapshot(&f.scene), before);
        assert_eq!(f.scene.tick_count(), 5);
    }

    #[test]
    fn test_commands_during_rollback_wait_for_live_tick() {
        let f = fixture();
        f.scene.mark_body_for_rollback(f.a);
        f.scene.stage.enqueue(crate::command::Command::SetLinearVelocity {
            handle: f.b,
            velocity: Vec3::Z,
        });
        assert!(f.scene.should_queue_commands());

        assert!(f.scene.roll_back_and_tick(Timestamp::from_nanos(TICK)));
        assert_eq!(f.scene.pending_command_count(), 1);

        f.clock.advance(TICK);
        f.scene.step();
        assert_eq!(f.scene.pending_command_count(), 0);
        assert_eq!(state(&f.scene, f.b).linear_velocity, Vec3::Z);
    }
}
