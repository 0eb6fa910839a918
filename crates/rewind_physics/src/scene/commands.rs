//! Typed mutation surface. Each method builds one `Command` and submits it;
//! sleep and wake requests go to the batched activation queues instead.

use rewind_core::{BodyHandle, ColliderId, ConstraintId};
use rewind_shared::{Quaternion, Transform, Vec3};

use super::PhysicsScene;
use crate::body::{Activation, BodySettings, ColliderDesc, MotionType, ObjectLayer};
use crate::command::Command;
use crate::constraint::{ConstraintSettings, VehicleSettings};
use crate::engine::PhysicsEngine;

impl<E: PhysicsEngine> PhysicsScene<E> {
    // -------------------------------------------------------------------------
    // Body lifecycle
    // -------------------------------------------------------------------------

    /// Creates a body at a registered handle. It joins the simulation on
    /// `add_body`.
    pub fn create_body(&self, handle: BodyHandle, settings: BodySettings, user_data: u64) {
        self.submit_command(Command::CreateBody {
            handle,
            settings: Box::new(settings),
            user_data,
        });
    }

    /// Creates a body at `handle` from `source`'s current settings.
    pub fn clone_body(&self, handle: BodyHandle, source: BodyHandle, user_data: u64) {
        self.submit_command(Command::CloneBody {
            handle,
            source,
            user_data,
        });
    }

    /// Destroys a body. Pending activation requests for it are dropped.
    pub fn destroy_body(&self, handle: BodyHandle) {
        self.submit_command(Command::DestroyBody { handle });
    }

    /// Adds a body to the simulation using the default wake state.
    pub fn add_body(&self, handle: BodyHandle) {
        self.submit_command(Command::AddBody { handle });
    }

    /// Removes a body from the simulation without destroying it.
    pub fn remove_body(&self, handle: BodyHandle) {
        self.submit_command(Command::RemoveBody { handle });
    }

    // -------------------------------------------------------------------------
    // Transform and motion
    // -------------------------------------------------------------------------

    /// Teleports a body.
    pub fn set_position(&self, handle: BodyHandle, position: Vec3, activation: Activation) {
        self.submit_command(Command::SetPosition {
            handle,
            position,
            activation,
        });
    }

    /// Rotates a body in place.
    pub fn set_rotation(&self, handle: BodyHandle, rotation: Quaternion, activation: Activation) {
        self.submit_command(Command::SetRotation {
            handle,
            rotation,
            activation,
        });
    }

    /// Teleports and rotates a body; a no-op when both already match.
    pub fn set_body_transform(
        &self,
        handle: BodyHandle,
        position: Vec3,
        rotation: Quaternion,
        activation: Activation,
    ) {
        self.submit_command(Command::SetTransform {
            handle,
            position,
            rotation,
            activation,
        });
    }

    /// Drives a kinematic body towards `position` over one tick.
    pub fn move_kinematic_position(&self, handle: BodyHandle, position: Vec3) {
        self.submit_command(Command::MoveKinematicPosition { handle, position });
    }

    /// Drives a kinematic body towards `rotation` over one tick.
    pub fn move_kinematic_rotation(&self, handle: BodyHandle, rotation: Quaternion) {
        self.submit_command(Command::MoveKinematicRotation { handle, rotation });
    }

    /// Drives a kinematic body towards a full transform over one tick.
    pub fn move_kinematic(&self, handle: BodyHandle, position: Vec3, rotation: Quaternion) {
        self.submit_command(Command::MoveKinematic {
            handle,
            position,
            rotation,
        });
    }

    /// Sets linear velocity.
    pub fn set_linear_velocity(&self, handle: BodyHandle, velocity: Vec3) {
        self.submit_command(Command::SetLinearVelocity { handle, velocity });
    }

    /// Sets angular velocity.
    pub fn set_angular_velocity(&self, handle: BodyHandle, velocity: Vec3) {
        self.submit_command(Command::SetAngularVelocity { handle, velocity });
    }

    /// Sets both velocities.
    pub fn set_velocities(&self, handle: BodyHandle, linear: Vec3, angular: Vec3) {
        self.submit_command(Command::SetVelocities {
            handle,
            linear,
            angular,
        });
    }

    /// Changes the motion type.
    pub fn set_motion_type(&self, handle: BodyHandle, motion_type: MotionType, activation: Activation) {
        self.submit_command(Command::SetMotionType {
            handle,
            motion_type,
            activation,
        });
    }

    /// Moves a body to another collision layer.
    pub fn set_object_layer(&self, handle: BodyHandle, layer: ObjectLayer) {
        self.submit_command(Command::SetObjectLayer { handle, layer });
    }

    // -------------------------------------------------------------------------
    // Colliders
    // -------------------------------------------------------------------------

    /// Attaches a collider.
    pub fn add_collider(&self, handle: BodyHandle, collider: ColliderId, desc: ColliderDesc) {
        self.submit_command(Command::AddCollider {
            handle,
            collider,
            desc: Box::new(desc),
        });
    }

    /// Replaces an attached collider.
    pub fn replace_collider(&self, handle: BodyHandle, collider: ColliderId, desc: ColliderDesc) {
        self.submit_command(Command::ReplaceCollider {
            handle,
            collider,
            desc: Box::new(desc),
        });
    }

    /// Detaches a collider.
    pub fn remove_collider(&self, handle: BodyHandle, collider: ColliderId) {
        self.submit_command(Command::RemoveCollider { handle, collider });
    }

    /// Moves an attached collider relative to its body.
    pub fn set_collider_transform(&self, handle: BodyHandle, collider: ColliderId, transform: Transform) {
        self.submit_command(Command::SetColliderTransform {
            handle,
            collider,
            transform,
        });
    }

    // -------------------------------------------------------------------------
    // Constraints
    // -------------------------------------------------------------------------

    /// Adds a constraint under an id from `register_constraint`.
    /// `BodyHandle::NULL` as the second body anchors it to the world.
    pub fn add_constraint(&self, constraint: ConstraintId, bodies: [BodyHandle; 2], settings: ConstraintSettings) {
        self.submit_command(Command::AddConstraint {
            constraint,
            bodies,
            settings: Box::new(settings),
        });
    }

    /// Adds a vehicle constraint to a chassis body.
    pub fn add_vehicle_constraint(&self, constraint: ConstraintId, body: BodyHandle, settings: VehicleSettings) {
        self.submit_command(Command::AddVehicleConstraint {
            constraint,
            body,
            settings: Box::new(settings),
        });
    }

    /// Removes a constraint; its id is recycled once the engine confirms.
    pub fn remove_constraint(&self, constraint: ConstraintId) {
        self.submit_command(Command::RemoveConstraint { constraint });
    }

    // -------------------------------------------------------------------------
    // Forces
    // -------------------------------------------------------------------------

    /// Applies an impulse at the centre of mass.
    pub fn add_impulse(&self, handle: BodyHandle, impulse: Vec3) {
        self.submit_command(Command::AddImpulse { handle, impulse });
    }

    /// Applies an impulse at a world location.
    pub fn add_impulse_at(&self, handle: BodyHandle, impulse: Vec3, location: Vec3) {
        self.submit_command(Command::AddImpulseAt {
            handle,
            impulse,
            location,
        });
    }

    /// Adds a force for the next tick.
    pub fn add_force(&self, handle: BodyHandle, force: Vec3) {
        self.submit_command(Command::AddForce { handle, force });
    }

    /// Adds a force at a world location for the next tick.
    pub fn add_force_at(&self, handle: BodyHandle, force: Vec3, location: Vec3) {
        self.submit_command(Command::AddForceAt {
            handle,
            force,
            location,
        });
    }

    /// Adds a torque for the next tick.
    pub fn add_torque(&self, handle: BodyHandle, torque: Vec3) {
        self.submit_command(Command::AddTorque { handle, torque });
    }

    /// Applies an angular impulse.
    pub fn add_angular_impulse(&self, handle: BodyHandle, impulse: Vec3) {
        self.submit_command(Command::AddAngularImpulse { handle, impulse });
    }

    // -------------------------------------------------------------------------
    // Activation
    // -------------------------------------------------------------------------

    /// Puts a body to sleep at the next flush.
    pub fn put_body_to_sleep(&self, handle: BodyHandle) {
        self.stage.request_sleep(handle);
    }

    /// Wakes a body at the next flush.
    pub fn wake_body_from_sleep(&self, handle: BodyHandle) {
        self.stage.request_wake(handle);
    }

    /// Puts every body to sleep at the next flush.
    pub fn put_all_bodies_to_sleep(&self) {
        self.stage.request_sleep_all();
    }

    /// Wakes every body at the next flush.
    pub fn wake_all_bodies_from_sleep(&self) {
        self.stage.request_wake_all();
    }

    /// Tracks `handle` for `wake_dynamic_bodies`.
    pub fn add_dynamic_body(&self, handle: BodyHandle) {
        self.dynamic_bodies.lock().insert(handle);
    }

    /// Stops tracking `handle` for `wake_dynamic_bodies`.
    pub fn remove_dynamic_body(&self, handle: BodyHandle) {
        self.dynamic_bodies.lock().remove(handle);
    }

    /// Queues a wake for every tracked dynamic body.
    pub fn wake_dynamic_bodies(&self) {
        let dynamic = self.dynamic_bodies.lock();
        for handle in dynamic.iter() {
            self.stage.request_wake(handle);
        }
    }

    /// Adds `handle` to the set corrected by the next `roll_back_and_tick`.
    pub fn mark_body_for_rollback(&self, handle: BodyHandle) {
        self.rolled_back.lock().insert(handle);
    }

    /// Bodies currently marked for the next rollback.
    #[must_use]
    pub fn rollback_set(&self) -> Vec<BodyHandle> {
        self.rolled_back.lock().as_slice().to_vec()
    }
}
