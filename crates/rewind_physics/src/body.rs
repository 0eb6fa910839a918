//! # Body and Collider Descriptions
//!
//! Value types carried by commands into the engine. They describe what to
//! build; the engine owns what gets built.

use rewind_core::{BodyHandle, ColliderId};
use rewind_shared::{Quaternion, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// How a body participates in the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionType {
    /// Never moves.
    Static = 0,
    /// Moved by the caller, not by forces.
    Kinematic = 1,
    /// Moved by the solver.
    #[default]
    Dynamic = 2,
}

impl MotionType {
    /// Converts from the stored byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Static),
            1 => Some(Self::Kinematic),
            2 => Some(Self::Dynamic),
            _ => None,
        }
    }
}

/// Whether a mutation should wake the body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    /// Wake the body.
    #[default]
    Activate,
    /// Leave the sleep state alone.
    DontActivate,
}

/// Collision layer of a body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLayer(pub u16);

impl ObjectLayer {
    /// Layer for static geometry.
    pub const NON_MOVING: Self = Self(0);
    /// Layer for everything that moves.
    pub const MOVING: Self = Self(1);
}

/// Surface response used when combining contacts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    /// Friction coefficient.
    pub friction: f32,
    /// Restitution (bounciness) in `[0, 1]`.
    pub restitution: f32,
}

impl PhysicsMaterial {
    /// Creates a material.
    #[must_use]
    pub const fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
        }
    }
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self::new(0.5, 0.0)
    }
}

/// Collider geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Sphere of `radius`.
    Sphere {
        /// Radius
        radius: f32,
    },
    /// Axis-aligned box in local space.
    Box {
        /// Half extents per axis
        half_extents: Vec3,
    },
    /// Capsule along local Z.
    Capsule {
        /// Half height of the cylindrical part
        half_height: f32,
        /// Radius
        radius: f32,
    },
    /// Cylinder along local Z.
    Cylinder {
        /// Half height
        half_height: f32,
        /// Radius
        radius: f32,
    },
}

impl ColliderShape {
    /// Radius of a sphere around the local origin enclosing the shape.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Self::Sphere { radius } => radius,
            Self::Box { half_extents } => half_extents.length(),
            Self::Capsule {
                half_height,
                radius,
            } => half_height + radius,
            Self::Cylinder {
                half_height,
                radius,
            } => (half_height * half_height + radius * radius).sqrt(),
        }
    }
}

/// A collider to attach to a body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColliderDesc {
    /// Geometry.
    pub shape: ColliderShape,
    /// Placement relative to the body.
    pub local_transform: Transform,
    /// Surface material.
    pub material: PhysicsMaterial,
    /// Reports contacts but generates no response.
    pub is_sensor: bool,
}

impl ColliderDesc {
    /// Collider at the body origin with the default material.
    #[must_use]
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            local_transform: Transform::IDENTITY,
            material: PhysicsMaterial::default(),
            is_sensor: false,
        }
    }

    /// Unit-sized box, the usual placeholder collider.
    #[must_use]
    pub fn unit_box() -> Self {
        Self::new(ColliderShape::Box {
            half_extents: Vec3::new(0.5, 0.5, 0.5),
        })
    }

    /// Replaces the material.
    #[must_use]
    pub const fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    /// Replaces the local transform.
    #[must_use]
    pub const fn with_local_transform(mut self, local_transform: Transform) -> Self {
        self.local_transform = local_transform;
        self
    }
}

/// Everything needed to create a body.
#[derive(Clone, Debug, PartialEq)]
pub struct BodySettings {
    /// Initial world position.
    pub position: Vec3,
    /// Initial world rotation.
    pub rotation: Quaternion,
    /// Initial linear velocity.
    pub linear_velocity: Vec3,
    /// Initial angular velocity.
    pub angular_velocity: Vec3,
    /// Motion type.
    pub motion_type: MotionType,
    /// Collision layer.
    pub object_layer: ObjectLayer,
    /// Mass in kilograms (ignored for static and kinematic bodies).
    pub mass: f32,
    /// Multiplier on scene gravity.
    pub gravity_factor: f32,
    /// Linear damping per second.
    pub linear_damping: f32,
    /// Angular damping per second.
    pub angular_damping: f32,
    /// Colliders attached at creation.
    pub colliders: Vec<(ColliderId, ColliderDesc)>,
}

impl BodySettings {
    /// Dynamic body at `position` with unit mass and no colliders.
    #[must_use]
    pub fn dynamic(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Kinematic body at `position`.
    #[must_use]
    pub fn kinematic(position: Vec3) -> Self {
        Self {
            position,
            motion_type: MotionType::Kinematic,
            ..Self::default()
        }
    }

    /// Static body at `position`.
    #[must_use]
    pub fn fixed(position: Vec3) -> Self {
        Self {
            position,
            motion_type: MotionType::Static,
            object_layer: ObjectLayer::NON_MOVING,
            ..Self::default()
        }
    }

    /// Adds a creation-time collider.
    #[must_use]
    pub fn with_collider(mut self, id: ColliderId, desc: ColliderDesc) -> Self {
        self.colliders.push((id, desc));
        self
    }

    /// Sets the gravity multiplier.
    #[must_use]
    pub const fn with_gravity_factor(mut self, gravity_factor: f32) -> Self {
        self.gravity_factor = gravity_factor;
        self
    }
}

impl Default for BodySettings {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            motion_type: MotionType::Dynamic,
            object_layer: ObjectLayer::MOVING,
            mass: 1.0,
            gravity_factor: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            colliders: Vec::new(),
        }
    }
}

/// Dynamic state of one body as reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    /// Body handle.
    pub handle: BodyHandle,
    /// World position.
    pub position: Vec3,
    /// World rotation.
    pub rotation: Quaternion,
    /// Linear velocity.
    pub linear_velocity: Vec3,
    /// Angular velocity.
    pub angular_velocity: Vec3,
    /// Motion type.
    pub motion_type: MotionType,
    /// Caller-supplied owner id (0 = none).
    pub user_data: u64,
    /// Body is awake.
    pub is_active: bool,
    /// Body is part of the simulation.
    pub in_simulation: bool,
}

impl BodyState {
    /// Position and rotation as a transform.
    #[must_use]
    pub const fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }

    /// Kinematic bodies are driven externally.
    #[must_use]
    pub fn is_kinematic(&self) -> bool {
        self.motion_type == MotionType::Kinematic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_type_byte_roundtrip() {
        for motion in [MotionType::Static, MotionType::Kinematic, MotionType::Dynamic] {
            assert_eq!(MotionType::from_u8(motion as u8), Some(motion));
        }
        assert_eq!(MotionType::from_u8(9), None);
    }

    #[test]
    fn test_bounding_radius() {
        let sphere = ColliderShape::Sphere { radius: 2.0 };
        assert_eq!(sphere.bounding_radius(), 2.0);

        let capsule = ColliderShape::Capsule {
            half_height: 1.0,
            radius: 0.5,
        };
        assert_eq!(capsule.bounding_radius(), 1.5);
    }

    #[test]
    fn test_settings_builders() {
        let settings = BodySettings::dynamic(Vec3::Z)
            .with_collider(ColliderId(1), ColliderDesc::unit_box())
            .with_gravity_factor(0.0);
        assert_eq!(settings.motion_type, MotionType::Dynamic);
        assert_eq!(settings.colliders.len(), 1);
        assert_eq!(settings.gravity_factor, 0.0);
        assert_eq!(BodySettings::fixed(Vec3::ZERO).object_layer, ObjectLayer::NON_MOVING);
    }
}
