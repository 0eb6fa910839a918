//! Mathematical types shared by the scheduler and its collaborators.
//!
//! All types are `#[repr(C)]` and `Pod` so they can be copied byte-for-byte
//! into state snapshots.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 3D Vector - position, velocity, force, impulse
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component (up)
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Component-wise maximum of absolute values.
    #[must_use]
    pub fn max_abs_component(self) -> f32 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Quaternion for rotations
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Quaternion {
    /// Creates a new quaternion
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Rotation of `angle` radians about a unit `axis`.
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        let a = axis.normalized();
        Self::new(a.x * s, a.y * s, a.z * s, c)
    }

    /// Rotation described by a scaled axis (axis * angle), e.g. angular
    /// velocity multiplied by a time step.
    #[must_use]
    pub fn from_scaled_axis(v: Vec3) -> Self {
        let angle = v.length();
        if angle <= f32::EPSILON {
            Self::IDENTITY
        } else {
            Self::from_axis_angle(v, angle)
        }
    }

    /// Inverse of `from_scaled_axis`, taking the shorter arc.
    #[must_use]
    pub fn to_scaled_axis(self) -> Vec3 {
        let q = if self.w < 0.0 {
            Self::new(-self.x, -self.y, -self.z, -self.w)
        } else {
            self
        };
        let sin_half = (q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
        if sin_half <= f32::EPSILON {
            return Vec3::ZERO;
        }
        let angle = 2.0 * sin_half.atan2(q.w);
        Vec3::new(q.x, q.y, q.z) * (angle / sin_half)
    }

    /// Squared norm
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    /// Unit quaternion, or identity when degenerate.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length_squared().sqrt();
        if len > f32::EPSILON {
            let inv = 1.0 / len;
            Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// Inverse of a unit quaternion.
    #[must_use]
    pub const fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotates a vector.
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Quaternion {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

/// Rigid transform - position + rotation
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Transform {
    /// Position
    pub position: Vec3,
    /// Rotation
    pub rotation: Quaternion,
}

impl Transform {
    /// Creates a new transform
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }

    /// Identity transform
    pub const IDENTITY: Self = Self::new(Vec3::ZERO, Quaternion::IDENTITY);

    /// Translation-only transform
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Quaternion::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a.dot(b), 32.0);
        assert_eq!(Vec3::X.cross(Vec3::Y), Vec3::Z);
    }

    #[test]
    fn test_quaternion_rotates_vector() {
        let q = Quaternion::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2);
        let v = q.rotate(Vec3::X);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, 1.0));
        assert!(approx(v.z, 0.0));
    }

    #[test]
    fn test_quaternion_composition() {
        let quarter = Quaternion::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2);
        let half = (quarter * quarter).normalized();
        let v = half.rotate(Vec3::X);
        assert!(approx(v.x, -1.0));
        assert!(approx(v.y, 0.0));
    }

    #[test]
    fn test_scaled_axis_zero_is_identity() {
        assert_eq!(Quaternion::from_scaled_axis(Vec3::ZERO), Quaternion::IDENTITY);
    }

    #[test]
    fn test_scaled_axis_inverse() {
        let spin = Vec3::new(0.0, 0.3, 0.4);
        let back = Quaternion::from_scaled_axis(spin).to_scaled_axis();
        assert!(approx(back.y, 0.3));
        assert!(approx(back.z, 0.4));
    }

    #[test]
    fn test_transform_bytemuck() {
        let t = Transform::IDENTITY;
        let bytes: &[u8] = bytemuck::bytes_of(&t);
        assert_eq!(bytes.len(), 28);
    }
}
