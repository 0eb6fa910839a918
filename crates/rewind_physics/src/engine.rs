//! # Engine Interface
//!
//! The rigid-body engine is an external collaborator. This trait is the
//! complete surface the scheduler needs from it: body lifecycle, state
//! mutation, batched activation, a single-tick step primitive and whole-state
//! save/restore.
//!
//! ## Contract
//!
//! - Every mutation takes a handle the scheduler has already validated with
//!   `contains_body`; engines may still ignore unknown handles.
//! - `step` must be deterministic: the same saved state plus the same calls
//!   produce bit-identical results.
//! - `restore_state` must either apply the whole payload or leave the engine
//!   untouched and return `false`.
//! - Saved state includes each body's activation flag.

use rewind_core::{BodyHandle, ColliderId, ConstraintId};
use rewind_shared::{Quaternion, Transform, Vec3};

use crate::body::{Activation, BodySettings, BodyState, ColliderDesc, MotionType, ObjectLayer};
use crate::constraint::{ConstraintSettings, VehicleSettings};
use crate::contact::ContactListener;
use crate::recorder::StateRecorder;

/// The deterministic simulation primitive driven by the scheduler.
pub trait PhysicsEngine: Send {
    /// Version of the layout written by `save_state`. Bump on any change.
    fn state_schema(&self) -> u32;

    // -------------------------------------------------------------------------
    // Body lifecycle
    // -------------------------------------------------------------------------

    /// Creates a body at `handle`. The body is not yet in the simulation.
    fn create_body(&mut self, handle: BodyHandle, settings: &BodySettings, user_data: u64);

    /// Destroys a body, removing it from the simulation first if needed.
    fn destroy_body(&mut self, handle: BodyHandle);

    /// Whether `handle` names a live body.
    fn contains_body(&self, handle: BodyHandle) -> bool;

    /// Creation settings reflecting the body's current state and colliders.
    fn body_settings(&self, handle: BodyHandle) -> Option<BodySettings>;

    /// Adds bodies to the simulation.
    fn add_bodies_to_simulation(&mut self, handles: &[BodyHandle], activation: Activation);

    /// Removes bodies from the simulation without destroying them.
    fn remove_bodies_from_simulation(&mut self, handles: &[BodyHandle]);

    /// Whether the body is currently simulated.
    fn is_in_simulation(&self, handle: BodyHandle) -> bool;

    // -------------------------------------------------------------------------
    // Transform, velocity, motion
    // -------------------------------------------------------------------------

    /// Teleports a body.
    fn set_position(&mut self, handle: BodyHandle, position: Vec3, activation: Activation);

    /// Rotates a body in place.
    fn set_rotation(&mut self, handle: BodyHandle, rotation: Quaternion, activation: Activation);

    /// Teleports and rotates a body.
    fn set_position_and_rotation(
        &mut self,
        handle: BodyHandle,
        position: Vec3,
        rotation: Quaternion,
        activation: Activation,
    );

    /// Sets velocities so a kinematic body reaches the target in `delta_time`.
    fn move_kinematic(
        &mut self,
        handle: BodyHandle,
        target_position: Vec3,
        target_rotation: Quaternion,
        delta_time: f32,
    );

    /// Sets linear velocity.
    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    /// Sets angular velocity.
    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    /// Sets both velocities.
    fn set_linear_and_angular_velocity(&mut self, handle: BodyHandle, linear: Vec3, angular: Vec3) {
        self.set_linear_velocity(handle, linear);
        self.set_angular_velocity(handle, angular);
    }

    /// Changes the motion type.
    fn set_motion_type(&mut self, handle: BodyHandle, motion_type: MotionType, activation: Activation);

    /// Moves a body to another collision layer.
    fn set_object_layer(&mut self, handle: BodyHandle, layer: ObjectLayer);

    // -------------------------------------------------------------------------
    // Colliders
    // -------------------------------------------------------------------------

    /// Attaches a collider.
    fn add_collider(&mut self, handle: BodyHandle, collider: ColliderId, desc: &ColliderDesc);

    /// Replaces an attached collider's shape and material.
    fn replace_collider(&mut self, handle: BodyHandle, collider: ColliderId, desc: &ColliderDesc);

    /// Detaches a collider.
    fn remove_collider(&mut self, handle: BodyHandle, collider: ColliderId);

    /// Moves an attached collider relative to its body.
    fn set_collider_transform(&mut self, handle: BodyHandle, collider: ColliderId, transform: Transform);

    // -------------------------------------------------------------------------
    // Constraints
    // -------------------------------------------------------------------------

    /// Adds a constraint. `BodyHandle::NULL` as the second body anchors to the world.
    fn add_constraint(&mut self, id: ConstraintId, bodies: [BodyHandle; 2], settings: &ConstraintSettings);

    /// Adds a vehicle constraint to a chassis body.
    fn add_vehicle_constraint(&mut self, id: ConstraintId, body: BodyHandle, settings: &VehicleSettings);

    /// Removes a constraint. Returns `false` if it did not exist.
    fn remove_constraint(&mut self, id: ConstraintId) -> bool;

    // -------------------------------------------------------------------------
    // Forces
    // -------------------------------------------------------------------------

    /// Applies an impulse at the centre of mass.
    fn add_impulse(&mut self, handle: BodyHandle, impulse: Vec3);

    /// Applies an impulse at a world location.
    fn add_impulse_at(&mut self, handle: BodyHandle, impulse: Vec3, location: Vec3);

    /// Accumulates a force for the next step.
    fn add_force(&mut self, handle: BodyHandle, force: Vec3);

    /// Accumulates a force at a world location for the next step.
    fn add_force_at(&mut self, handle: BodyHandle, force: Vec3, location: Vec3);

    /// Accumulates a torque for the next step.
    fn add_torque(&mut self, handle: BodyHandle, torque: Vec3);

    /// Applies an angular impulse.
    fn add_angular_impulse(&mut self, handle: BodyHandle, impulse: Vec3);

    // -------------------------------------------------------------------------
    // Activation
    // -------------------------------------------------------------------------

    /// Wakes a batch of bodies.
    fn activate_bodies(&mut self, handles: &[BodyHandle]);

    /// Puts a batch of bodies to sleep.
    fn deactivate_bodies(&mut self, handles: &[BodyHandle]);

    /// Wakes every body in the simulation.
    fn activate_all_bodies(&mut self);

    /// Puts every body in the simulation to sleep.
    fn deactivate_all_bodies(&mut self);

    // -------------------------------------------------------------------------
    // Simulation
    // -------------------------------------------------------------------------

    /// Advances one tick of `delta_time` seconds.
    fn step(
        &mut self,
        delta_time: f32,
        collision_steps: u32,
        integration_steps: u32,
        listener: &mut dyn ContactListener,
    );

    /// Writes the handles of every awake body into `out` (cleared first).
    fn active_bodies(&self, out: &mut Vec<BodyHandle>);

    /// Number of awake bodies.
    fn num_active_bodies(&self) -> usize;

    /// Current dynamic state of a body.
    fn body_state(&self, handle: BodyHandle) -> Option<BodyState>;

    // -------------------------------------------------------------------------
    // State capture
    // -------------------------------------------------------------------------

    /// Appends the full simulation state at the recorder's cursor.
    fn save_state(&self, recorder: &mut StateRecorder);

    /// Reads the full simulation state from the recorder's cursor.
    fn restore_state(&mut self, recorder: &mut StateRecorder) -> bool;
}
