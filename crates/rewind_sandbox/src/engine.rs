//! # Sandbox Engine
//!
//! Slot table of bodies addressed by generational handles, stepped with
//! semi-implicit Euler.
//!
//! ## Step
//!
//! ```text
//!   for each collision step:
//!       for each integration step:   forces + gravity ─► velocity ─► pose
//!       contacts:                    sphere pairs ─► listener ─► impulses
//!   clear accumulated forces
//! ```
//!
//! ## Saved State
//!
//! Dynamic state only: poses, velocities, motion type, activation, pending
//! forces and the contact cache. Restore requires the same set of live
//! bodies as when the state was saved and otherwise changes nothing.

use std::collections::{BTreeMap, BTreeSet};

use rewind_core::{BodyHandle, ColliderId, ConstraintId};
use rewind_physics::{
    Activation, BodySettings, BodyState, ColliderDesc, ConstraintSettings, ContactListener, MotionType, ObjectLayer,
    PhysicsEngine, RecorderError, StateRecorder, VehicleSettings,
};
use rewind_shared::{Quaternion, Transform, Vec3};

use crate::body::{SandboxBody, Slot};
use crate::collision;

/// Layout version of `save_state`.
pub const SANDBOX_STATE_SCHEMA: u32 = 1;

/// Default gravity (Z up).
pub const GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -9.81);

/// A constraint as recorded by the sandbox. Constraints are stored but not
/// solved.
#[derive(Clone, Debug, PartialEq)]
pub enum SandboxConstraint {
    /// Two-body constraint.
    Pair {
        /// Constrained bodies.
        bodies: [BodyHandle; 2],
        /// Kind and parameters.
        settings: ConstraintSettings,
    },
    /// Vehicle on a chassis.
    Vehicle {
        /// Chassis body.
        body: BodyHandle,
        /// Wheels and drivetrain.
        settings: VehicleSettings,
    },
}

/// Per-body dynamic state as written by `save_state`.
struct SavedBody {
    handle: BodyHandle,
    position: Vec3,
    rotation: Quaternion,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    motion_type: MotionType,
    active: bool,
    in_simulation: bool,
    force: Vec3,
    torque: Vec3,
}

impl SavedBody {
    fn write(body: &SandboxBody, recorder: &mut StateRecorder) {
        recorder.write_u64(body.handle.to_bits());
        recorder.write_pod(&body.position);
        recorder.write_pod(&body.rotation);
        recorder.write_pod(&body.linear_velocity);
        recorder.write_pod(&body.angular_velocity);
        recorder.write_u8(body.motion_type as u8);
        recorder.write_bool(body.active);
        recorder.write_bool(body.in_simulation);
        recorder.write_pod(&body.force);
        recorder.write_pod(&body.torque);
    }

    fn read(recorder: &mut StateRecorder) -> Result<Option<Self>, RecorderError> {
        let handle = BodyHandle::from_bits(recorder.read_u64()?);
        let position = recorder.read_pod()?;
        let rotation = recorder.read_pod()?;
        let linear_velocity = recorder.read_pod()?;
        let angular_velocity = recorder.read_pod()?;
        let Some(motion_type) = MotionType::from_u8(recorder.read_u8()?) else {
            return Ok(None);
        };
        Ok(Some(Self {
            handle,
            position,
            rotation,
            linear_velocity,
            angular_velocity,
            motion_type,
            active: recorder.read_bool()?,
            in_simulation: recorder.read_bool()?,
            force: recorder.read_pod()?,
            torque: recorder.read_pod()?,
        }))
    }

    fn apply(self, body: &mut SandboxBody) {
        body.position = self.position;
        body.rotation = self.rotation;
        body.linear_velocity = self.linear_velocity;
        body.angular_velocity = self.angular_velocity;
        body.motion_type = self.motion_type;
        body.active = self.active;
        body.in_simulation = self.in_simulation;
        body.force = self.force;
        body.torque = self.torque;
    }
}

type ContactCache = BTreeSet<(BodyHandle, BodyHandle)>;

/// Reads a whole `save_state` payload. `Ok(None)` for a malformed body record.
fn decode_state(recorder: &mut StateRecorder) -> Result<Option<(Vec<SavedBody>, ContactCache)>, RecorderError> {
    let count = recorder.read_u32()? as usize;
    let mut saved = Vec::with_capacity(count.min(recorder.remaining()));
    for _ in 0..count {
        match SavedBody::read(recorder)? {
            Some(body) => saved.push(body),
            None => return Ok(None),
        }
    }
    let pairs = recorder.read_u32()? as usize;
    let mut contacts = ContactCache::new();
    for _ in 0..pairs {
        let a = BodyHandle::from_bits(recorder.read_u64()?);
        let b = BodyHandle::from_bits(recorder.read_u64()?);
        contacts.insert((a, b));
    }
    Ok(Some((saved, contacts)))
}

/// Deterministic reference engine.
#[derive(Clone, Debug)]
pub struct SandboxEngine {
    slots: Vec<Slot>,
    constraints: BTreeMap<ConstraintId, SandboxConstraint>,
    contacts: ContactCache,
    gravity: Vec3,
}

impl Default for SandboxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxEngine {
    /// Empty world with standard gravity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_gravity(GRAVITY)
    }

    /// Empty world with custom gravity.
    #[must_use]
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            slots: Vec::new(),
            constraints: BTreeMap::new(),
            contacts: ContactCache::new(),
            gravity,
        }
    }

    /// Live bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies().count()
    }

    /// Colliders attached to a body.
    #[must_use]
    pub fn collider_count(&self, handle: BodyHandle) -> usize {
        self.body(handle).map_or(0, |body| body.colliders.len())
    }

    /// Recorded constraints.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// A recorded constraint.
    #[must_use]
    pub fn constraint(&self, id: ConstraintId) -> Option<&SandboxConstraint> {
        self.constraints.get(&id)
    }

    /// Collision layer of a body.
    #[must_use]
    pub fn object_layer(&self, handle: BodyHandle) -> Option<ObjectLayer> {
        self.body(handle).map(|body| body.object_layer)
    }

    /// Full body record.
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&SandboxBody> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.body.as_ref()
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut SandboxBody> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.body.as_mut()
    }

    fn bodies(&self) -> impl Iterator<Item = &SandboxBody> + '_ {
        self.slots.iter().filter_map(|slot| slot.body.as_ref())
    }

    fn wake_if(body: &mut SandboxBody, activation: Activation) {
        if activation == Activation::Activate {
            body.wake();
        }
    }

    fn integrate(&mut self, h: f32) {
        let gravity = self.gravity;
        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            if !body.active || !body.in_simulation {
                continue;
            }
            if body.motion_type == MotionType::Dynamic {
                let acceleration = gravity * body.gravity_factor + body.force * (1.0 / body.mass);
                body.linear_velocity += acceleration * h;
                body.angular_velocity += body.torque * (h / body.mass);
                body.linear_velocity = body.linear_velocity * (1.0 / (1.0 + body.linear_damping * h));
                body.angular_velocity = body.angular_velocity * (1.0 / (1.0 + body.angular_damping * h));
            }
            body.position += body.linear_velocity * h;
            body.rotation = (Quaternion::from_scaled_axis(body.angular_velocity * h) * body.rotation).normalized();
        }
    }

    fn collide(&mut self, listener: &mut dyn ContactListener) {
        let mut touching = ContactCache::new();
        for i in 0..self.slots.len() {
            for j in (i + 1)..self.slots.len() {
                let (head, tail) = self.slots.split_at_mut(j);
                let (Some(a), Some(b)) = (head[i].body.as_mut(), tail[0].body.as_mut()) else {
                    continue;
                };
                if !collision::may_collide(a, b) {
                    continue;
                }
                let Some(hit) = collision::overlap(a, b) else {
                    continue;
                };

                let key = (a.handle, b.handle);
                let (pair, manifold) = collision::describe(a, b, &hit);
                let settings = if self.contacts.contains(&key) {
                    listener.on_contact_persisted(&pair, &manifold)
                } else {
                    listener.on_contact_added(&pair, &manifold)
                };
                touching.insert(key);

                a.wake();
                b.wake();
                collision::resolve(a, b, &hit, settings);
            }
        }
        for &(a, b) in self.contacts.difference(&touching) {
            listener.on_contact_removed([a, b]);
        }
        self.contacts = touching;
    }
}

impl PhysicsEngine for SandboxEngine {
    fn state_schema(&self) -> u32 {
        SANDBOX_STATE_SCHEMA
    }

    fn create_body(&mut self, handle: BodyHandle, settings: &BodySettings, user_data: u64) {
        let index = handle.index() as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, Slot::default);
        }
        let slot = &mut self.slots[index];
        if slot.body.is_some() {
            tracing::warn!(%handle, "sandbox slot already occupied, body not created");
            return;
        }
        slot.generation = handle.generation();
        slot.body = Some(SandboxBody::new(handle, settings, user_data));
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        if let Some(slot) = self.slots.get_mut(handle.index() as usize) {
            if slot.generation == handle.generation() {
                slot.body = None;
            }
        }
        self.contacts.retain(|&(a, b)| a != handle && b != handle);
    }

    fn contains_body(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_some()
    }

    fn body_settings(&self, handle: BodyHandle) -> Option<BodySettings> {
        self.body(handle).map(SandboxBody::settings)
    }

    fn add_bodies_to_simulation(&mut self, handles: &[BodyHandle], activation: Activation) {
        for &handle in handles {
            if let Some(body) = self.body_mut(handle) {
                body.in_simulation = true;
                Self::wake_if(body, activation);
            }
        }
    }

    fn remove_bodies_from_simulation(&mut self, handles: &[BodyHandle]) {
        for &handle in handles {
            if let Some(body) = self.body_mut(handle) {
                body.in_simulation = false;
                body.active = false;
            }
        }
    }

    fn is_in_simulation(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_some_and(|body| body.in_simulation)
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3, activation: Activation) {
        if let Some(body) = self.body_mut(handle) {
            body.position = position;
            Self::wake_if(body, activation);
        }
    }

    fn set_rotation(&mut self, handle: BodyHandle, rotation: Quaternion, activation: Activation) {
        if let Some(body) = self.body_mut(handle) {
            body.rotation = rotation.normalized();
            Self::wake_if(body, activation);
        }
    }

    fn set_position_and_rotation(
        &mut self,
        handle: BodyHandle,
        position: Vec3,
        rotation: Quaternion,
        activation: Activation,
    ) {
        if let Some(body) = self.body_mut(handle) {
            body.position = position;
            body.rotation = rotation.normalized();
            Self::wake_if(body, activation);
        }
    }

    fn move_kinematic(&mut self, handle: BodyHandle, target_position: Vec3, target_rotation: Quaternion, delta_time: f32) {
        let Some(body) = self.body_mut(handle) else {
            return;
        };
        if body.motion_type == MotionType::Static || delta_time <= 0.0 {
            return;
        }
        let inv_dt = 1.0 / delta_time;
        body.linear_velocity = (target_position - body.position) * inv_dt;
        let delta = target_rotation.normalized() * body.rotation.conjugate();
        body.angular_velocity = delta.to_scaled_axis() * inv_dt;
        body.wake();
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.body_mut(handle) {
            body.linear_velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.body_mut(handle) {
            body.angular_velocity = velocity;
        }
    }

    fn set_motion_type(&mut self, handle: BodyHandle, motion_type: MotionType, activation: Activation) {
        if let Some(body) = self.body_mut(handle) {
            body.motion_type = motion_type;
            if motion_type == MotionType::Static {
                body.active = false;
                body.linear_velocity = Vec3::ZERO;
                body.angular_velocity = Vec3::ZERO;
            } else {
                Self::wake_if(body, activation);
            }
        }
    }

    fn set_object_layer(&mut self, handle: BodyHandle, layer: ObjectLayer) {
        if let Some(body) = self.body_mut(handle) {
            body.object_layer = layer;
        }
    }

    fn add_collider(&mut self, handle: BodyHandle, collider: ColliderId, desc: &ColliderDesc) {
        if let Some(body) = self.body_mut(handle) {
            body.colliders.retain(|(id, _)| *id != collider);
            body.colliders.push((collider, *desc));
        }
    }

    fn replace_collider(&mut self, handle: BodyHandle, collider: ColliderId, desc: &ColliderDesc) {
        if let Some(body) = self.body_mut(handle) {
            match body.colliders.iter_mut().find(|(id, _)| *id == collider) {
                Some((_, existing)) => *existing = *desc,
                None => tracing::debug!(%handle, collider = collider.0, "replacing unknown collider"),
            }
        }
    }

    fn remove_collider(&mut self, handle: BodyHandle, collider: ColliderId) {
        if let Some(body) = self.body_mut(handle) {
            body.colliders.retain(|(id, _)| *id != collider);
        }
    }

    fn set_collider_transform(&mut self, handle: BodyHandle, collider: ColliderId, transform: Transform) {
        if let Some(body) = self.body_mut(handle) {
            if let Some((_, desc)) = body.colliders.iter_mut().find(|(id, _)| *id == collider) {
                desc.local_transform = transform;
            }
        }
    }

    fn add_constraint(&mut self, id: ConstraintId, bodies: [BodyHandle; 2], settings: &ConstraintSettings) {
        self.constraints.insert(
            id,
            SandboxConstraint::Pair {
                bodies,
                settings: settings.clone(),
            },
        );
    }

    fn add_vehicle_constraint(&mut self, id: ConstraintId, body: BodyHandle, settings: &VehicleSettings) {
        self.constraints.insert(
            id,
            SandboxConstraint::Vehicle {
                body,
                settings: settings.clone(),
            },
        );
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        self.constraints.remove(&id).is_some()
    }

    fn add_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        if let Some(body) = self.body_mut(handle) {
            body.linear_velocity += impulse * body.inverse_mass();
            body.wake();
        }
    }

    fn add_impulse_at(&mut self, handle: BodyHandle, impulse: Vec3, location: Vec3) {
        if let Some(body) = self.body_mut(handle) {
            let inv_mass = body.inverse_mass();
            body.linear_velocity += impulse * inv_mass;
            body.angular_velocity += (location - body.position).cross(impulse) * inv_mass;
            body.wake();
        }
    }

    fn add_force(&mut self, handle: BodyHandle, force: Vec3) {
        if let Some(body) = self.body_mut(handle) {
            body.force += force;
            body.wake();
        }
    }

    fn add_force_at(&mut self, handle: BodyHandle, force: Vec3, location: Vec3) {
        if let Some(body) = self.body_mut(handle) {
            body.torque += (location - body.position).cross(force);
            body.force += force;
            body.wake();
        }
    }

    fn add_torque(&mut self, handle: BodyHandle, torque: Vec3) {
        if let Some(body) = self.body_mut(handle) {
            body.torque += torque;
            body.wake();
        }
    }

    fn add_angular_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        if let Some(body) = self.body_mut(handle) {
            body.angular_velocity += impulse * body.inverse_mass();
            body.wake();
        }
    }

    fn activate_bodies(&mut self, handles: &[BodyHandle]) {
        for &handle in handles {
            if let Some(body) = self.body_mut(handle) {
                body.wake();
            }
        }
    }

    fn deactivate_bodies(&mut self, handles: &[BodyHandle]) {
        for &handle in handles {
            if let Some(body) = self.body_mut(handle) {
                body.active = false;
            }
        }
    }

    fn activate_all_bodies(&mut self) {
        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            body.wake();
        }
    }

    fn deactivate_all_bodies(&mut self) {
        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            body.active = false;
        }
    }

    fn step(&mut self, delta_time: f32, collision_steps: u32, integration_steps: u32, listener: &mut dyn ContactListener) {
        let collision_steps = collision_steps.max(1);
        let integration_steps = integration_steps.max(1);
        #[allow(clippy::cast_precision_loss)]
        let h = delta_time / (collision_steps * integration_steps) as f32;

        for _ in 0..collision_steps {
            for _ in 0..integration_steps {
                self.integrate(h);
            }
            self.collide(listener);
        }

        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            body.force = Vec3::ZERO;
            body.torque = Vec3::ZERO;
        }
    }

    fn active_bodies(&self, out: &mut Vec<BodyHandle>) {
        out.clear();
        out.extend(self.bodies().filter(|body| body.active).map(|body| body.handle));
    }

    fn num_active_bodies(&self) -> usize {
        self.bodies().filter(|body| body.active).count()
    }

    fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        self.body(handle).map(SandboxBody::state)
    }

    fn save_state(&self, recorder: &mut StateRecorder) {
        recorder.write_u32(u32::try_from(self.body_count()).unwrap_or(u32::MAX));
        for body in self.bodies() {
            SavedBody::write(body, recorder);
        }
        recorder.write_u32(u32::try_from(self.contacts.len()).unwrap_or(u32::MAX));
        for &(a, b) in &self.contacts {
            recorder.write_u64(a.to_bits());
            recorder.write_u64(b.to_bits());
        }
    }

    fn restore_state(&mut self, recorder: &mut StateRecorder) -> bool {
        let decoded = decode_state(recorder);
        let Ok(Some((saved, contacts))) = decoded else {
            tracing::debug!("sandbox state could not be decoded");
            return false;
        };
        if saved.len() != self.body_count() || saved.iter().any(|body| !self.contains_body(body.handle)) {
            tracing::debug!(
                saved = saved.len(),
                live = self.body_count(),
                "sandbox state does not match the live body set"
            );
            return false;
        }

        for body in saved {
            if let Some(live) = self.body_mut(body.handle) {
                body.apply(live);
            }
        }
        self.contacts = contacts;
        true
    }
}
