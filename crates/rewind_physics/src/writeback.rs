//! # Transform Write-Back
//!
//! After ticking, every awake non-kinematic body is extrapolated by the
//! leftover fraction of a tick and pushed to the scene graph through a
//! `TransformSink`.

use std::collections::HashMap;

use parking_lot::Mutex;
use rewind_core::BodyHandle;
use rewind_shared::{Quaternion, Transform, Vec3};

use crate::body::BodyState;
use crate::engine::PhysicsEngine;

/// Receives final world transforms. Implemented by the owning scene graph.
pub trait TransformSink: Send + Sync {
    /// Writes the world transform of the entity that owns a body.
    fn write_world_transform(&self, owner: u64, position: Vec3, rotation: Quaternion);
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TransformSink for NullSink {
    fn write_world_transform(&self, _: u64, _: Vec3, _: Quaternion) {}
}

/// Sink that keeps the latest transform per owner.
#[derive(Debug, Default)]
pub struct RecordingSink {
    transforms: Mutex<HashMap<u64, Transform>>,
    writes: Mutex<u64>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest transform written for `owner`.
    #[must_use]
    pub fn get(&self, owner: u64) -> Option<Transform> {
        self.transforms.lock().get(&owner).copied()
    }

    /// Total writes received.
    #[must_use]
    pub fn writes(&self) -> u64 {
        *self.writes.lock()
    }

    /// Forgets everything.
    pub fn clear(&self) {
        self.transforms.lock().clear();
        *self.writes.lock() = 0;
    }
}

impl TransformSink for RecordingSink {
    fn write_world_transform(&self, owner: u64, position: Vec3, rotation: Quaternion) {
        self.transforms
            .lock()
            .insert(owner, Transform::new(position, rotation));
        *self.writes.lock() += 1;
    }
}

/// Projects a body forward by `seconds` using its current velocities.
#[must_use]
pub fn extrapolate(state: &BodyState, seconds: f32) -> Transform {
    let position = state.position + state.linear_velocity * seconds;
    let spin = state.angular_velocity * seconds;
    let rotation = if spin.length() > 1.0e-6 {
        (Quaternion::from_scaled_axis(spin) * state.rotation).normalized()
    } else {
        state.rotation
    };
    Transform::new(position, rotation)
}

/// Publishes one body if it has an owner.
pub fn publish(sink: &dyn TransformSink, state: &BodyState, seconds: f32) -> bool {
    if state.user_data == 0 {
        return false;
    }
    let transform = extrapolate(state, seconds);
    sink.write_world_transform(state.user_data, transform.position, transform.rotation);
    true
}

/// Publishes every awake, non-kinematic body. Returns the number written.
pub fn publish_active<E: PhysicsEngine + ?Sized>(
    engine: &E,
    sink: &dyn TransformSink,
    seconds: f32,
    scratch: &mut Vec<BodyHandle>,
) -> usize {
    engine.active_bodies(scratch);
    scratch
        .iter()
        .filter_map(|&handle| engine.body_state(handle))
        .filter(|state| !state.is_kinematic())
        .filter(|state| publish(sink, state, seconds))
        .count()
}
