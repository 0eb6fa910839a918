//! Body storage for the sandbox engine.

use rewind_core::{BodyHandle, ColliderId};
use rewind_physics::{BodySettings, BodyState, ColliderDesc, MotionType, ObjectLayer, PhysicsMaterial};
use rewind_shared::{Quaternion, Vec3};

/// One rigid body.
#[derive(Clone, Debug, PartialEq)]
pub struct SandboxBody {
    /// Handle the body was created under.
    pub handle: BodyHandle,
    /// World position of the centre of mass.
    pub position: Vec3,
    /// World rotation.
    pub rotation: Quaternion,
    /// Linear velocity.
    pub linear_velocity: Vec3,
    /// Angular velocity.
    pub angular_velocity: Vec3,
    /// Motion type.
    pub motion_type: MotionType,
    /// Collision layer.
    pub object_layer: ObjectLayer,
    /// Mass in kilograms.
    pub mass: f32,
    /// Multiplier on gravity.
    pub gravity_factor: f32,
    /// Linear damping per second.
    pub linear_damping: f32,
    /// Angular damping per second.
    pub angular_damping: f32,
    /// Attached colliders, in attach order.
    pub colliders: Vec<(ColliderId, ColliderDesc)>,
    /// Owner id.
    pub user_data: u64,
    /// Awake.
    pub active: bool,
    /// Part of the simulation.
    pub in_simulation: bool,
    /// Force accumulated for the next step.
    pub force: Vec3,
    /// Torque accumulated for the next step.
    pub torque: Vec3,
}

impl SandboxBody {
    /// Builds a body from creation settings. It starts outside the simulation.
    #[must_use]
    pub fn new(handle: BodyHandle, settings: &BodySettings, user_data: u64) -> Self {
        Self {
            handle,
            position: settings.position,
            rotation: settings.rotation.normalized(),
            linear_velocity: settings.linear_velocity,
            angular_velocity: settings.angular_velocity,
            motion_type: settings.motion_type,
            object_layer: settings.object_layer,
            mass: settings.mass.max(1.0e-3),
            gravity_factor: settings.gravity_factor,
            linear_damping: settings.linear_damping,
            angular_damping: settings.angular_damping,
            colliders: settings.colliders.clone(),
            user_data,
            active: false,
            in_simulation: false,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        }
    }

    /// Settings that would recreate this body as it is now.
    #[must_use]
    pub fn settings(&self) -> BodySettings {
        BodySettings {
            position: self.position,
            rotation: self.rotation,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            motion_type: self.motion_type,
            object_layer: self.object_layer,
            mass: self.mass,
            gravity_factor: self.gravity_factor,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
            colliders: self.colliders.clone(),
        }
    }

    /// Reported state.
    #[must_use]
    pub fn state(&self) -> BodyState {
        BodyState {
            handle: self.handle,
            position: self.position,
            rotation: self.rotation,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            motion_type: self.motion_type,
            user_data: self.user_data,
            is_active: self.active,
            in_simulation: self.in_simulation,
        }
    }

    /// Inverse mass; zero for bodies the solver cannot push.
    #[must_use]
    pub fn inverse_mass(&self) -> f32 {
        if self.motion_type == MotionType::Dynamic {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Static bodies never wake.
    #[must_use]
    pub fn can_activate(&self) -> bool {
        self.in_simulation && self.motion_type != MotionType::Static
    }

    /// Wakes the body if it can be woken.
    pub fn wake(&mut self) {
        self.active = self.can_activate();
    }

    /// Bounding sphere around every collider, or `None` without colliders.
    #[must_use]
    pub fn bounding_sphere(&self) -> Option<(Vec3, f32)> {
        self.colliders
            .iter()
            .map(|(_, desc)| desc.local_transform.position.length() + desc.shape.bounding_radius())
            .reduce(f32::max)
            .map(|radius| (self.position, radius))
    }

    /// Material of the first collider.
    #[must_use]
    pub fn material(&self) -> PhysicsMaterial {
        self.colliders
            .first()
            .map(|(_, desc)| desc.material)
            .unwrap_or_default()
    }
}

/// Slot in the body table. The generation outlives the body.
#[derive(Clone, Debug, Default)]
pub struct Slot {
    /// Generation of the latest body created here.
    pub generation: u32,
    /// The body, if alive.
    pub body: Option<SandboxBody>,
}
