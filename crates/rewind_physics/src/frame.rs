//! Runs the frames of independent scenes in parallel. Scenes share nothing,
//! so each one gets its own scoped thread for the frame.

use crate::engine::PhysicsEngine;
use crate::scene::PhysicsScene;

/// Runs `run_frame` on every scene and returns once all have finished.
pub fn run_frames<E: PhysicsEngine>(scenes: &[&PhysicsScene<E>]) {
    match scenes {
        [] => {}
        [scene] => scene.run_frame(),
        _ => std::thread::scope(|scope| {
            for scene in scenes {
                scope.spawn(move || scene.run_frame());
            }
        }),
    }
}
