//! # Constraint Descriptions
//!
//! Settings for every constraint kind the engine can be asked to build.
//! Points and axes are in world space at creation time.

use rewind_shared::{Transform, Vec3};

/// Lower/upper bound pair. `min > max` means the axis is free.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limit {
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
}

impl Limit {
    /// Axis is locked at zero.
    pub const LOCKED: Self = Self { min: 0.0, max: 0.0 };
    /// Axis is unconstrained.
    pub const FREE: Self = Self {
        min: f32::MAX,
        max: f32::MIN,
    };

    /// Creates a limit.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Whether the axis is unconstrained.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.min > self.max
    }
}

/// One constraint between two bodies.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintSettings {
    /// Six degrees of freedom with per-axis limits.
    SixDof {
        /// Constraint frame on body 1
        frame1: Transform,
        /// Constraint frame on body 2
        frame2: Transform,
        /// Translation limits along X, Y, Z
        translation: [Limit; 3],
        /// Rotation limits about X, Y, Z
        rotation: [Limit; 3],
    },
    /// Ragdoll-style shoulder joint.
    SwingTwist {
        /// Joint position
        position: Vec3,
        /// Twist axis
        twist_axis: Vec3,
        /// Half cone angle in the normal plane
        normal_half_cone: f32,
        /// Half cone angle in the twist plane
        plane_half_cone: f32,
        /// Twist range
        twist: Limit,
    },
    /// Ball and socket.
    Point {
        /// Anchor on body 1
        point1: Vec3,
        /// Anchor on body 2
        point2: Vec3,
    },
    /// Prismatic joint.
    Slider {
        /// Anchor point
        point: Vec3,
        /// Slide axis
        axis: Vec3,
        /// Travel range
        limits: Limit,
    },
    /// Keeps two anchors within a distance range.
    Distance {
        /// Anchor on body 1
        point1: Vec3,
        /// Anchor on body 2
        point2: Vec3,
        /// Allowed distance
        range: Limit,
    },
    /// Revolute joint.
    Hinge {
        /// Hinge point
        point: Vec3,
        /// Hinge axis
        axis: Vec3,
        /// Angle range
        limits: Limit,
    },
    /// Welds two bodies together.
    Fixed {
        /// Use the midpoint of the bodies as the weld point
        auto_detect_point: bool,
        /// Weld point when not auto-detected
        point: Vec3,
    },
    /// Limits the angle between two axes.
    Cone {
        /// Cone apex
        point: Vec3,
        /// Twist axis
        twist_axis: Vec3,
        /// Half cone angle
        half_cone_angle: f32,
    },
    /// Moves body 2 along a path fixed to body 1.
    Path {
        /// Path control points
        points: Vec<Vec3>,
        /// Path is closed
        looping: bool,
        /// Initial position along the path, `[0, 1]`
        fraction: f32,
    },
}

impl ConstraintSettings {
    /// Short name of the constraint kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SixDof { .. } => "six_dof",
            Self::SwingTwist { .. } => "swing_twist",
            Self::Point { .. } => "point",
            Self::Slider { .. } => "slider",
            Self::Distance { .. } => "distance",
            Self::Hinge { .. } => "hinge",
            Self::Fixed { .. } => "fixed",
            Self::Cone { .. } => "cone",
            Self::Path { .. } => "path",
        }
    }
}

/// One wheel of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelSettings {
    /// Attachment point relative to the chassis
    pub position: Vec3,
    /// Wheel radius
    pub radius: f32,
    /// Suspension travel
    pub suspension_length: f32,
}

/// Vehicle constraint on a single chassis body.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleSettings {
    /// Wheels
    pub wheels: Vec<WheelSettings>,
    /// Peak engine torque
    pub max_engine_torque: f32,
    /// Maximum steering angle in radians
    pub max_steer_angle: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_free() {
        assert!(Limit::FREE.is_free());
        assert!(!Limit::LOCKED.is_free());
        assert!(!Limit::new(-1.0, 1.0).is_free());
    }

    #[test]
    fn test_kind_names() {
        let hinge = ConstraintSettings::Hinge {
            point: Vec3::ZERO,
            axis: Vec3::Z,
            limits: Limit::FREE,
        };
        assert_eq!(hinge.kind(), "hinge");
    }
}
