//! # Rollback Demo
//!
//! A late correction arrives for one body:
//!
//! Simulate 10 ticks → learn the true velocity at tick 4 → amend that
//! history entry → roll back and replay → only the corrected body moves.
//!
//! Usage: `rollback_demo [scene.toml]`

use std::sync::Arc;

use rewind_physics::{
    BodySettings, ColliderDesc, ColliderId, ManualClock, PhysicsEngine, PhysicsError, PhysicsScene, RecordingSink,
    SceneConfig, Timestamp, Vec3,
};
use rewind_sandbox::SandboxEngine;

/// Ticks simulated before the correction arrives.
const TICKS_BEFORE_CORRECTION: u64 = 10;

/// Tick the correction applies to.
const CORRECTED_TICK: u64 = 4;

fn load_config() -> Result<SceneConfig, PhysicsError> {
    match std::env::args().nth(1) {
        Some(path) => Ok(SceneConfig::from_toml_file(path)?),
        None => Ok(SceneConfig::default()),
    }
}

fn main() -> Result<(), PhysicsError> {
    let config = load_config()?;
    let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
    let sink = Arc::new(RecordingSink::new());
    let scene = PhysicsScene::builder(SandboxEngine::new())
        .config(config)
        .clock(clock.clone())
        .sink(sink.clone())
        .build()?;
    let tick = scene.tick_duration();

    // =========================================================================
    // STEP 1: Two players, both thrown upward
    // =========================================================================
    let corrected = scene.register_body();
    let bystander = scene.register_body();
    for (handle, x, owner) in [(corrected, 0.0, 1), (bystander, 10.0, 2)] {
        let settings = BodySettings::dynamic(Vec3::new(x, 0.0, 0.0)).with_collider(ColliderId(0), ColliderDesc::unit_box());
        scene.create_body(handle, settings, owner);
        scene.add_body(handle);
        scene.set_linear_velocity(handle, Vec3::new(0.0, 0.0, 8.0));
    }

    // =========================================================================
    // STEP 2: Simulate
    // =========================================================================
    clock.advance(tick * TICKS_BEFORE_CORRECTION + tick / 4);
    scene.run_frame();

    let before = scene.with_engine(|engine| (engine.body_state(corrected), engine.body_state(bystander)));
    println!("after {} ticks:", scene.tick_count());
    println!("  corrected: {:?}", before.0.map(|s| s.position));
    println!("  bystander: {:?}", before.1.map(|s| s.position));

    // =========================================================================
    // STEP 3: Amend history with the authoritative velocity
    // =========================================================================
    let at = Timestamp::from_nanos(tick * CORRECTED_TICK);
    let amended = scene.try_rollback_and_visit(at, |engine| {
        engine.set_linear_velocity(corrected, Vec3::new(5.0, 0.0, 8.0));
        true
    })?;
    println!("history entry at tick {CORRECTED_TICK} amended: {amended}");

    // =========================================================================
    // STEP 4: Replay the corrected body only
    // =========================================================================
    scene.mark_body_for_rollback(corrected);
    let replayed = scene.try_roll_back_and_tick(at)?;

    let after = scene.with_engine(|engine| (engine.body_state(corrected), engine.body_state(bystander)));
    println!("replayed {replayed} ticks:");
    println!("  corrected: {:?}", after.0.map(|s| s.position));
    println!("  bystander: {:?}", after.1.map(|s| s.position));
    println!("  bystander untouched: {}", before.1 == after.1);
    println!("  presented corrected transform: {:?}", sink.get(1));

    let stats = scene.stats();
    println!("commands flushed: {}, applied directly: {}", stats.flushed, stats.immediate);
    Ok(())
}
