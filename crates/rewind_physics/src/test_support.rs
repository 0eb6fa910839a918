//! In-crate engine double for unit tests.
//!
//! Records the name of every mutating call and keeps just enough body state
//! for dispatch checks and save/restore.

use std::collections::{BTreeMap, BTreeSet};

use rewind_core::{BodyHandle, ColliderId, ConstraintId};
use rewind_shared::{Quaternion, Transform, Vec3};

use crate::body::{Activation, BodySettings, BodyState, ColliderDesc, MotionType, ObjectLayer};
use crate::constraint::{ConstraintSettings, VehicleSettings};
use crate::contact::ContactListener;
use crate::engine::PhysicsEngine;
use crate::error::RecorderError;
use crate::recorder::StateRecorder;

#[derive(Debug)]
struct MockBody {
    settings: BodySettings,
    state: BodyState,
    force: Vec3,
}

type SavedBody = (BodyHandle, Vec3, Quaternion, Vec3, Vec3, bool, bool);

fn read_saved_body(recorder: &mut StateRecorder) -> Result<SavedBody, RecorderError> {
    Ok((
        BodyHandle::from_bits(recorder.read_u64()?),
        recorder.read_pod()?,
        recorder.read_pod()?,
        recorder.read_pod()?,
        recorder.read_pod()?,
        recorder.read_bool()?,
        recorder.read_bool()?,
    ))
}

#[derive(Debug)]
pub(crate) struct RecordingEngine {
    pub calls: Vec<&'static str>,
    pub schema: u32,
    bodies: BTreeMap<BodyHandle, MockBody>,
    constraints: BTreeSet<ConstraintId>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            schema: 1,
            bodies: BTreeMap::new(),
            constraints: BTreeSet::new(),
        }
    }
}

impl RecordingEngine {
    fn body(&mut self, handle: BodyHandle) -> Option<&mut BodyState> {
        self.bodies.get_mut(&handle).map(|body| &mut body.state)
    }

    fn wake(&mut self, handle: BodyHandle, activation: Activation) {
        if activation == Activation::Activate {
            if let Some(state) = self.body(handle) {
                state.is_active = state.in_simulation;
            }
        }
    }
}

impl PhysicsEngine for RecordingEngine {
    fn state_schema(&self) -> u32 {
        self.schema
    }

    fn create_body(&mut self, handle: BodyHandle, settings: &BodySettings, user_data: u64) {
        self.calls.push("create_body");
        let state = BodyState {
            handle,
            position: settings.position,
            rotation: settings.rotation,
            linear_velocity: settings.linear_velocity,
            angular_velocity: settings.angular_velocity,
            motion_type: settings.motion_type,
            user_data,
            is_active: false,
            in_simulation: false,
        };
        self.bodies.insert(
            handle,
            MockBody {
                settings: settings.clone(),
                state,
                force: Vec3::ZERO,
            },
        );
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        self.calls.push("destroy_body");
        self.bodies.remove(&handle);
    }

    fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle)
    }

    fn body_settings(&self, handle: BodyHandle) -> Option<BodySettings> {
        self.bodies.get(&handle).map(|body| body.settings.clone())
    }

    fn add_bodies_to_simulation(&mut self, handles: &[BodyHandle], activation: Activation) {
        self.calls.push("add_bodies_to_simulation");
        for &handle in handles {
            if let Some(state) = self.body(handle) {
                state.in_simulation = true;
                state.is_active = activation == Activation::Activate;
            }
        }
    }

    fn remove_bodies_from_simulation(&mut self, handles: &[BodyHandle]) {
        self.calls.push("remove_bodies_from_simulation");
        for &handle in handles {
            if let Some(state) = self.body(handle) {
                state.in_simulation = false;
                state.is_active = false;
            }
        }
    }

    fn is_in_simulation(&self, handle: BodyHandle) -> bool {
        self.bodies.get(&handle).is_some_and(|body| body.state.in_simulation)
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3, activation: Activation) {
        self.calls.push("set_position");
        if let Some(state) = self.body(handle) {
            state.position = position;
        }
        self.wake(handle, activation);
    }

    fn set_rotation(&mut self, handle: BodyHandle, rotation: Quaternion, activation: Activation) {
        self.calls.push("set_rotation");
        if let Some(state) = self.body(handle) {
            state.rotation = rotation;
        }
        self.wake(handle, activation);
    }

    fn set_position_and_rotation(
        &mut self,
        handle: BodyHandle,
        position: Vec3,
        rotation: Quaternion,
        activation: Activation,
    ) {
        self.calls.push("set_position_and_rotation");
        if let Some(state) = self.body(handle) {
            state.position = position;
            state.rotation = rotation;
        }
        self.wake(handle, activation);
    }

    fn move_kinematic(&mut self, handle: BodyHandle, target: Vec3, _: Quaternion, delta_time: f32) {
        self.calls.push("move_kinematic");
        if let Some(state) = self.body(handle) {
            state.linear_velocity = (target - state.position) * (1.0 / delta_time);
        }
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        self.calls.push("set_linear_velocity");
        if let Some(state) = self.body(handle) {
            state.linear_velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        self.calls.push("set_angular_velocity");
        if let Some(state) = self.body(handle) {
            state.angular_velocity = velocity;
        }
    }

    fn set_motion_type(&mut self, handle: BodyHandle, motion_type: MotionType, activation: Activation) {
        self.calls.push("set_motion_type");
        if let Some(state) = self.body(handle) {
            state.motion_type = motion_type;
        }
        self.wake(handle, activation);
    }

    fn set_object_layer(&mut self, _: BodyHandle, _: ObjectLayer) {
        self.calls.push("set_object_layer");
    }

    fn add_collider(&mut self, _: BodyHandle, _: ColliderId, _: &ColliderDesc) {
        self.calls.push("add_collider");
    }

    fn replace_collider(&mut self, _: BodyHandle, _: ColliderId, _: &ColliderDesc) {
        self.calls.push("replace_collider");
    }

    fn remove_collider(&mut self, _: BodyHandle, _: ColliderId) {
        self.calls.push("remove_collider");
    }

    fn set_collider_transform(&mut self, _: BodyHandle, _: ColliderId, _: Transform) {
        self.calls.push("set_collider_transform");
    }

    fn add_constraint(&mut self, id: ConstraintId, _: [BodyHandle; 2], _: &ConstraintSettings) {
        self.calls.push("add_constraint");
        self.constraints.insert(id);
    }

    fn add_vehicle_constraint(&mut self, id: ConstraintId, _: BodyHandle, _: &VehicleSettings) {
        self.calls.push("add_vehicle_constraint");
        self.constraints.insert(id);
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        self.calls.push("remove_constraint");
        self.constraints.remove(&id)
    }

    fn add_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        self.calls.push("add_impulse");
        if let Some(state) = self.body(handle) {
            state.linear_velocity += impulse;
        }
    }

    fn add_impulse_at(&mut self, handle: BodyHandle, impulse: Vec3, _: Vec3) {
        self.calls.push("add_impulse_at");
        if let Some(state) = self.body(handle) {
            state.linear_velocity += impulse;
        }
    }

    fn add_force(&mut self, handle: BodyHandle, force: Vec3) {
        self.calls.push("add_force");
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.force += force;
        }
    }

    fn add_force_at(&mut self, handle: BodyHandle, force: Vec3, _: Vec3) {
        self.calls.push("add_force_at");
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.force += force;
        }
    }

    fn add_torque(&mut self, _: BodyHandle, _: Vec3) {
        self.calls.push("add_torque");
    }

    fn add_angular_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        self.calls.push("add_angular_impulse");
        if let Some(state) = self.body(handle) {
            state.angular_velocity += impulse;
        }
    }

    fn activate_bodies(&mut self, handles: &[BodyHandle]) {
        self.calls.push("activate_bodies");
        for &handle in handles {
            self.wake(handle, Activation::Activate);
        }
    }

    fn deactivate_bodies(&mut self, handles: &[BodyHandle]) {
        self.calls.push("deactivate_bodies");
        for &handle in handles {
            if let Some(state) = self.body(handle) {
                state.is_active = false;
            }
        }
    }

    fn activate_all_bodies(&mut self) {
        self.calls.push("activate_all_bodies");
        for body in self.bodies.values_mut() {
            body.state.is_active = body.state.in_simulation;
        }
    }

    fn deactivate_all_bodies(&mut self) {
        self.calls.push("deactivate_all_bodies");
        for body in self.bodies.values_mut() {
            body.state.is_active = false;
        }
    }

    fn step(&mut self, delta_time: f32, _: u32, _: u32, _: &mut dyn ContactListener) {
        self.calls.push("step");
        for body in self.bodies.values_mut() {
            if !body.state.is_active || body.state.motion_type == MotionType::Static {
                body.force = Vec3::ZERO;
                continue;
            }
            if body.state.motion_type == MotionType::Dynamic {
                body.state.linear_velocity += body.force * (delta_time / body.settings.mass);
            }
            body.state.position += body.state.linear_velocity * delta_time;
            body.force = Vec3::ZERO;
        }
    }

    fn active_bodies(&self, out: &mut Vec<BodyHandle>) {
        out.clear();
        out.extend(self.bodies.iter().filter(|(_, b)| b.state.is_active).map(|(h, _)| *h));
    }

    fn num_active_bodies(&self) -> usize {
        self.bodies.values().filter(|b| b.state.is_active).count()
    }

    fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        self.bodies.get(&handle).map(|body| body.state)
    }

    fn save_state(&self, recorder: &mut StateRecorder) {
        recorder.write_u32(self.bodies.len() as u32);
        for (handle, body) in &self.bodies {
            recorder.write_u64(handle.to_bits());
            recorder.write_pod(&body.state.position);
            recorder.write_pod(&body.state.rotation);
            recorder.write_pod(&body.state.linear_velocity);
            recorder.write_pod(&body.state.angular_velocity);
            recorder.write_bool(body.state.is_active);
            recorder.write_bool(body.state.in_simulation);
        }
    }

    fn restore_state(&mut self, recorder: &mut StateRecorder) -> bool {
        let Ok(count) = recorder.read_u32() else {
            return false;
        };
        if count as usize != self.bodies.len() {
            return false;
        }
        let mut states = Vec::with_capacity(self.bodies.len());
        for _ in 0..count {
            let read = read_saved_body(recorder);
            match read {
                Ok(entry) if self.bodies.contains_key(&entry.0) => states.push(entry),
                _ => return false,
            }
        }
        for (handle, position, rotation, linear, angular, active, in_sim) in states {
            if let Some(state) = self.body(handle) {
                state.position = position;
                state.rotation = rotation;
                state.linear_velocity = linear;
                state.angular_velocity = angular;
                state.is_active = active;
                state.in_simulation = in_sim;
            }
        }
        true
    }
}
