//! # Commands
//!
//! One deferred mutation per variant. Commands are created on any thread,
//! moved into the queue, and consumed exactly once by the command stage.
//! Large payloads are boxed to keep the enum small in the queue.

use rewind_core::{BodyHandle, ColliderId, ConstraintId};
use rewind_shared::{Quaternion, Transform, Vec3};

use crate::body::{Activation, BodySettings, ColliderDesc, MotionType, ObjectLayer};
use crate::constraint::{ConstraintSettings, VehicleSettings};

/// A deferred engine mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Create a body at a registered handle.
    CreateBody {
        /// Target handle
        handle: BodyHandle,
        /// Creation settings
        settings: Box<BodySettings>,
        /// Owner id
        user_data: u64,
    },
    /// Create a body with the current settings and colliders of another body.
    CloneBody {
        /// Target handle
        handle: BodyHandle,
        /// Body to copy
        source: BodyHandle,
        /// Owner id of the copy
        user_data: u64,
    },
    /// Destroy a body.
    DestroyBody {
        /// Body
        handle: BodyHandle,
    },
    /// Add a body to the simulation with the scene's default wake state.
    AddBody {
        /// Body
        handle: BodyHandle,
    },
    /// Remove a body from the simulation, keeping it alive.
    RemoveBody {
        /// Body
        handle: BodyHandle,
    },
    /// Teleport.
    SetPosition {
        /// Body
        handle: BodyHandle,
        /// New position
        position: Vec3,
        /// Wake policy
        activation: Activation,
    },
    /// Rotate in place.
    SetRotation {
        /// Body
        handle: BodyHandle,
        /// New rotation
        rotation: Quaternion,
        /// Wake policy
        activation: Activation,
    },
    /// Teleport and rotate. Skipped when the body is already there.
    SetTransform {
        /// Body
        handle: BodyHandle,
        /// New position
        position: Vec3,
        /// New rotation
        rotation: Quaternion,
        /// Wake policy
        activation: Activation,
    },
    /// Drive a kinematic body towards a position, keeping its rotation.
    MoveKinematicPosition {
        /// Body
        handle: BodyHandle,
        /// Target position
        position: Vec3,
    },
    /// Drive a kinematic body towards a rotation, keeping its position.
    MoveKinematicRotation {
        /// Body
        handle: BodyHandle,
        /// Target rotation
        rotation: Quaternion,
    },
    /// Drive a kinematic body towards a full transform.
    MoveKinematic {
        /// Body
        handle: BodyHandle,
        /// Target position
        position: Vec3,
        /// Target rotation
        rotation: Quaternion,
    },
    /// Set linear velocity.
    SetLinearVelocity {
        /// Body
        handle: BodyHandle,
        /// Velocity
        velocity: Vec3,
    },
    /// Set angular velocity.
    SetAngularVelocity {
        /// Body
        handle: BodyHandle,
        /// Velocity
        velocity: Vec3,
    },
    /// Set both velocities.
    SetVelocities {
        /// Body
        handle: BodyHandle,
        /// Linear velocity
        linear: Vec3,
        /// Angular velocity
        angular: Vec3,
    },
    /// Change motion type.
    SetMotionType {
        /// Body
        handle: BodyHandle,
        /// New motion type
        motion_type: MotionType,
        /// Wake policy
        activation: Activation,
    },
    /// Change collision layer.
    SetObjectLayer {
        /// Body
        handle: BodyHandle,
        /// New layer
        layer: ObjectLayer,
    },
    /// Attach a collider.
    AddCollider {
        /// Body
        handle: BodyHandle,
        /// Collider id
        collider: ColliderId,
        /// Collider description
        desc: Box<ColliderDesc>,
    },
    /// Replace an attached collider.
    ReplaceCollider {
        /// Body
        handle: BodyHandle,
        /// Collider id
        collider: ColliderId,
        /// New description
        desc: Box<ColliderDesc>,
    },
    /// Detach a collider.
    RemoveCollider {
        /// Body
        handle: BodyHandle,
        /// Collider id
        collider: ColliderId,
    },
    /// Move an attached collider relative to its body.
    SetColliderTransform {
        /// Body
        handle: BodyHandle,
        /// Collider id
        collider: ColliderId,
        /// Local transform
        transform: Transform,
    },
    /// Add a two-body constraint.
    AddConstraint {
        /// Registered constraint id
        constraint: ConstraintId,
        /// Constrained bodies, second may be `BodyHandle::NULL` for the world
        bodies: [BodyHandle; 2],
        /// Constraint settings
        settings: Box<ConstraintSettings>,
    },
    /// Add a vehicle constraint.
    AddVehicleConstraint {
        /// Registered constraint id
        constraint: ConstraintId,
        /// Chassis body
        body: BodyHandle,
        /// Vehicle settings
        settings: Box<VehicleSettings>,
    },
    /// Remove a constraint and return its id to the scene.
    RemoveConstraint {
        /// Constraint id
        constraint: ConstraintId,
    },
    /// Impulse at the centre of mass.
    AddImpulse {
        /// Body
        handle: BodyHandle,
        /// Impulse
        impulse: Vec3,
    },
    /// Impulse at a world location.
    AddImpulseAt {
        /// Body
        handle: BodyHandle,
        /// Impulse
        impulse: Vec3,
        /// World location
        location: Vec3,
    },
    /// Force for the next step.
    AddForce {
        /// Body
        handle: BodyHandle,
        /// Force
        force: Vec3,
    },
    /// Force at a world location for the next step.
    AddForceAt {
        /// Body
        handle: BodyHandle,
        /// Force
        force: Vec3,
        /// World location
        location: Vec3,
    },
    /// Torque for the next step.
    AddTorque {
        /// Body
        handle: BodyHandle,
        /// Torque
        torque: Vec3,
    },
    /// Angular impulse.
    AddAngularImpulse {
        /// Body
        handle: BodyHandle,
        /// Angular impulse
        impulse: Vec3,
    },
}

impl Command {
    /// Short name of the variant, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateBody { .. } => "create_body",
            Self::CloneBody { .. } => "clone_body",
            Self::DestroyBody { .. } => "destroy_body",
            Self::AddBody { .. } => "add_body",
            Self::RemoveBody { .. } => "remove_body",
            Self::SetPosition { .. } => "set_position",
            Self::SetRotation { .. } => "set_rotation",
            Self::SetTransform { .. } => "set_transform",
            Self::MoveKinematicPosition { .. } => "move_kinematic_position",
            Self::MoveKinematicRotation { .. } => "move_kinematic_rotation",
            Self::MoveKinematic { .. } => "move_kinematic",
            Self::SetLinearVelocity { .. } => "set_linear_velocity",
            Self::SetAngularVelocity { .. } => "set_angular_velocity",
            Self::SetVelocities { .. } => "set_velocities",
            Self::SetMotionType { .. } => "set_motion_type",
            Self::SetObjectLayer { .. } => "set_object_layer",
            Self::AddCollider { .. } => "add_collider",
            Self::ReplaceCollider { .. } => "replace_collider",
            Self::RemoveCollider { .. } => "remove_collider",
            Self::SetColliderTransform { .. } => "set_collider_transform",
            Self::AddConstraint { .. } => "add_constraint",
            Self::AddVehicleConstraint { .. } => "add_vehicle_constraint",
            Self::RemoveConstraint { .. } => "remove_constraint",
            Self::AddImpulse { .. } => "add_impulse",
            Self::AddImpulseAt { .. } => "add_impulse_at",
            Self::AddForce { .. } => "add_force",
            Self::AddForceAt { .. } => "add_force_at",
            Self::AddTorque { .. } => "add_torque",
            Self::AddAngularImpulse { .. } => "add_angular_impulse",
        }
    }

    /// The body this command targets, if it targets exactly one.
    #[must_use]
    pub const fn body(&self) -> Option<BodyHandle> {
        match self {
            Self::CreateBody { handle, .. }
            | Self::CloneBody { handle, .. }
            | Self::DestroyBody { handle }
            | Self::AddBody { handle }
            | Self::RemoveBody { handle }
            | Self::SetPosition { handle, .. }
            | Self::SetRotation { handle, .. }
            | Self::SetTransform { handle, .. }
            | Self::MoveKinematicPosition { handle, .. }
            | Self::MoveKinematicRotation { handle, .. }
            | Self::MoveKinematic { handle, .. }
            | Self::SetLinearVelocity { handle, .. }
            | Self::SetAngularVelocity { handle, .. }
            | Self::SetVelocities { handle, .. }
            | Self::SetMotionType { handle, .. }
            | Self::SetObjectLayer { handle, .. }
            | Self::AddCollider { handle, .. }
            | Self::ReplaceCollider { handle, .. }
            | Self::RemoveCollider { handle, .. }
            | Self::SetColliderTransform { handle, .. }
            | Self::AddImpulse { handle, .. }
            | Self::AddImpulseAt { handle, .. }
            | Self::AddForce { handle, .. }
            | Self::AddForceAt { handle, .. }
            | Self::AddTorque { handle, .. }
            | Self::AddAngularImpulse { handle, .. } => Some(*handle),
            Self::AddVehicleConstraint { body, .. } => Some(*body),
            Self::AddConstraint { .. } | Self::RemoveConstraint { .. } => None,
        }
    }

    /// Whether the command mentions `handle` anywhere.
    #[must_use]
    pub fn references(&self, handle: BodyHandle) -> bool {
        match self {
            Self::CloneBody {
                handle: target,
                source,
                ..
            } => *target == handle || *source == handle,
            Self::AddConstraint { bodies, .. } => bodies.contains(&handle),
            _ => self.body() == Some(handle),
        }
    }

    /// Body taken out of the simulation by this command.
    #[must_use]
    pub const fn retired_body(&self) -> Option<BodyHandle> {
        match self {
            Self::DestroyBody { handle } | Self::RemoveBody { handle } => Some(*handle),
            _ => None,
        }
    }

    /// Whether the command brings `handle` (back) into existence or into
    /// the simulation. Commands after it may legitimately refer to `handle`.
    #[must_use]
    pub fn revives(&self, handle: BodyHandle) -> bool {
        match self {
            Self::CreateBody { handle: target, .. }
            | Self::CloneBody { handle: target, .. }
            | Self::AddBody { handle: target } => *target == handle,
            _ => false,
        }
    }
}
