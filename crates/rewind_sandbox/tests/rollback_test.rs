//! Integration tests for rollback and history visits on the sandbox engine.

use rewind_physics::{
    BodyHandle, BodySettings, BodyState, ColliderDesc, ColliderId, ManualClock, PhysicsEngine, PhysicsScene,
    RecordingSink, RollbackError, SceneConfig, SnapshotError, StateRecorder, Timestamp, Vec3,
};
use rewind_sandbox::SandboxEngine;
use std::sync::Arc;

const TICK: u64 = 1_000_000_000 / 60;

struct World {
    scene: PhysicsScene<SandboxEngine>,
    clock: Arc<ManualClock>,
    sink: Arc<RecordingSink>,
}

impl World {
    fn new(config: SceneConfig) -> Self {
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
        let sink = Arc::new(RecordingSink::new());
        let scene = PhysicsScene::builder(SandboxEngine::new())
            .config(config)
            .clock(clock.clone())
            .sink(sink.clone())
            .build()
            .unwrap();
        Self { scene, clock, sink }
    }

    /// A box thrown upward at `x`, far from everything else.
    fn throw(&self, x: f32, owner: u64) -> BodyHandle {
        let handle = self.scene.register_body();
        let settings =
            BodySettings::dynamic(Vec3::new(x, 0.0, 0.0)).with_collider(ColliderId(0), ColliderDesc::unit_box());
        self.scene.create_body(handle, settings, owner);
        self.scene.add_body(handle);
        self.scene.set_linear_velocity(handle, Vec3::new(0.0, 0.0, 6.0));
        handle
    }

    fn run_ticks(&self, ticks: u64) {
        self.clock.advance(TICK * ticks);
        self.scene.run_frame();
    }

    fn snapshot(&self) -> Vec<u8> {
        self.scene.with_engine(|engine| {
            let mut recorder = StateRecorder::new();
            engine.save_state(&mut recorder);
            recorder.as_bytes().to_vec()
        })
    }

    fn state(&self, handle: BodyHandle) -> BodyState {
        self.scene.with_engine(|engine| engine.body_state(handle).unwrap())
    }
}

#[test]
fn test_empty_set_rollback_is_verified_noop() {
    let world = World::new(SceneConfig::default());
    let a = world.throw(0.0, 1);
    let b = world.throw(10.0, 2);
    world.run_ticks(5);

    let before = world.snapshot();
    let (ticks, next) = (world.scene.tick_count(), world.scene.next_tick_time());
    let (a_before, b_before) = (world.state(a), world.state(b));

    assert!(world.scene.roll_back_and_tick(Timestamp::from_nanos(TICK * 2)));

    assert_eq!(world.scene.tick_count(), ticks);
    assert_eq!(world.scene.next_tick_time(), next);
    assert_eq!(world.state(a), a_before);
    assert_eq!(world.state(b), b_before);
    assert_eq!(world.snapshot(), before);
}

#[test]
fn test_corrected_body_matches_reference_replay() {
    let correction = Vec3::new(4.0, 0.0, 6.0);

    // Reference: the correction was known at tick 2 all along.
    let reference = World::new(SceneConfig::default());
    let ra = reference.throw(0.0, 1);
    reference.throw(10.0, 2);
    reference.run_ticks(2);
    reference.scene.set_linear_velocity(ra, correction);
    reference.run_ticks(4);

    // Live: the correction arrives after the fact.
    let world = World::new(SceneConfig::default());
    let a = world.throw(0.0, 1);
    let b = world.throw(10.0, 2);
    world.run_ticks(6);
    let b_before = world.state(b);

    let t2 = Timestamp::from_nanos(TICK * 2);
    let amended = world
        .scene
        .try_rollback_and_visit(t2, |engine| {
            engine.set_linear_velocity(a, correction);
            true
        })
        .unwrap();
    assert!(amended);

    world.scene.mark_body_for_rollback(a);
    world.sink.clear();
    let replayed = world.scene.try_roll_back_and_tick(t2).unwrap();

    assert_eq!(replayed, 4);
    let (corrected, expected) = (world.state(a), reference.state(ra));
    assert_eq!(corrected.position, expected.position);
    assert_eq!(corrected.rotation, expected.rotation);
    assert_eq!(corrected.linear_velocity, expected.linear_velocity);
    assert_eq!(world.state(b), b_before);
    assert!(world.sink.get(1).is_some());
    assert!(world.sink.get(2).is_none());
}

#[test]
fn test_target_older_than_history_is_rejected() {
    let config = SceneConfig {
        history_capacity: 4,
        ..SceneConfig::default()
    };
    let world = World::new(config);
    let a = world.throw(0.0, 1);
    world.run_ticks(10);
    world.scene.mark_body_for_rollback(a);
    let before = world.snapshot();

    let err = world
        .scene
        .try_roll_back_and_tick(Timestamp::from_nanos(TICK))
        .unwrap_err();

    assert_eq!(
        err,
        RollbackError::OutOfWindow {
            requested: Timestamp::from_nanos(TICK)
        }
    );
    assert_eq!(world.snapshot(), before);
    assert_eq!(world.scene.tick_count(), 10);
    assert!(world.scene.rollback_set().is_empty());
}

#[test]
fn test_restore_failure_leaves_present_untouched() {
    let world = World::new(SceneConfig::default());
    let a = world.throw(0.0, 1);
    world.run_ticks(3);
    // Born after the entries at ticks 0..3 were recorded.
    world.throw(20.0, 3);
    world.run_ticks(2);

    world.scene.mark_body_for_rollback(a);
    let before = world.snapshot();
    let err = world
        .scene
        .try_roll_back_and_tick(Timestamp::from_nanos(TICK))
        .unwrap_err();

    assert_eq!(err, RollbackError::Restore(SnapshotError::Rejected));
    assert_eq!(world.snapshot(), before);
    assert!(!world.scene.is_rolling_back());
}

#[test]
fn test_visit_never_alters_present() {
    let world = World::new(SceneConfig::default());
    let a = world.throw(0.0, 1);
    world.run_ticks(5);
    let before = world.snapshot();
    let mut seen = None;

    assert!(world.scene.rollback_and_visit(Timestamp::from_nanos(TICK), |engine| {
        seen = engine.body_state(a);
        engine.set_position(a, Vec3::new(0.0, 0.0, -50.0), rewind_physics::Activation::Activate);
        true
    }));

    assert_eq!(world.snapshot(), before);
    // One tick of flight: rising, below where it is now.
    let seen = seen.unwrap();
    assert!(seen.position.z > 0.0);
    assert!(seen.position.z < world.state(a).position.z);
}

#[test]
fn test_replay_is_deterministic_across_repeats() {
    let world = World::new(SceneConfig::default());
    let a = world.throw(0.0, 1);
    world.throw(0.5, 2);
    world.run_ticks(8);

    let t3 = Timestamp::from_nanos(TICK * 3);
    world.scene.mark_body_for_rollback(a);
    assert!(world.scene.roll_back_and_tick(t3));
    let first = world.snapshot();

    world.scene.mark_body_for_rollback(a);
    assert!(world.scene.roll_back_and_tick(t3));
    assert_eq!(world.snapshot(), first);
}
