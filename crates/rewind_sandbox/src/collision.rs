//! Bounding-sphere narrow phase and impulse response.
//!
//! Every collider set is approximated by one sphere around the body's
//! centre of mass. Good enough to exercise contact callbacks and to make
//! replay divergence visible, nothing more.

use rewind_core::BodyHandle;
use rewind_physics::{ContactManifold, ContactPair, ContactSettings, MotionType};
use rewind_shared::Vec3;

use crate::body::SandboxBody;

/// Overlap between two bodies found this sub-step.
#[derive(Clone, Debug)]
pub struct Overlap {
    /// Bodies in slot order.
    pub bodies: [BodyHandle; 2],
    /// Normal from the first body to the second.
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
}

/// Whether the pair may collide at all.
#[must_use]
pub fn may_collide(a: &SandboxBody, b: &SandboxBody) -> bool {
    if !a.in_simulation || !b.in_simulation {
        return false;
    }
    if a.motion_type != MotionType::Dynamic && b.motion_type != MotionType::Dynamic {
        return false;
    }
    a.active || b.active
}

/// Sphere-sphere overlap test.
#[must_use]
pub fn overlap(a: &SandboxBody, b: &SandboxBody) -> Option<Overlap> {
    let (ca, ra) = a.bounding_sphere()?;
    let (cb, rb) = b.bounding_sphere()?;
    let delta = cb - ca;
    let distance = delta.length();
    let depth = ra + rb - distance;
    if depth <= 0.0 {
        return None;
    }
    let normal = if distance > 1.0e-6 { delta * (1.0 / distance) } else { Vec3::Z };
    Some(Overlap {
        bodies: [a.handle, b.handle],
        normal,
        depth,
    })
}

/// Callback payload for an overlap.
#[must_use]
pub fn describe(a: &SandboxBody, b: &SandboxBody, overlap: &Overlap) -> (ContactPair, ContactManifold) {
    let point = a.position + overlap.normal * (a.bounding_sphere().map_or(0.0, |(_, r)| r) - overlap.depth * 0.5);
    (
        ContactPair {
            bodies: overlap.bodies,
            user_data: [a.user_data, b.user_data],
            materials: [a.material(), b.material()],
        },
        ContactManifold {
            points: vec![point],
            normal: overlap.normal,
            penetration: overlap.depth,
        },
    )
}

/// Separates the pair and applies restitution and friction impulses.
pub fn resolve(a: &mut SandboxBody, b: &mut SandboxBody, overlap: &Overlap, settings: ContactSettings) {
    let inv_a = a.inverse_mass();
    let inv_b = b.inverse_mass();
    let inv_sum = inv_a + inv_b;
    if inv_sum <= 0.0 {
        return;
    }
    let n = overlap.normal;

    // Positional correction split by inverse mass.
    let push = overlap.depth / inv_sum;
    a.position = a.position - n * (push * inv_a);
    b.position = b.position + n * (push * inv_b);

    let relative = b.linear_velocity - a.linear_velocity;
    let approach = relative.dot(n);
    if approach >= 0.0 {
        return;
    }

    let j = -(1.0 + settings.combined_restitution) * approach / inv_sum;
    a.linear_velocity = a.linear_velocity - n * (j * inv_a);
    b.linear_velocity = b.linear_velocity + n * (j * inv_b);

    let tangent = relative - n * approach;
    let slide = tangent.length();
    if slide > 1.0e-6 {
        let jt = (slide / inv_sum).min(settings.combined_friction * j);
        let t = tangent * (1.0 / slide);
        a.linear_velocity = a.linear_velocity + t * (jt * inv_a);
        b.linear_velocity = b.linear_velocity - t * (jt * inv_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_core::ColliderId;
    use rewind_physics::{BodySettings, ColliderDesc, ColliderShape, PhysicsMaterial};

    fn ball(index: u32, position: Vec3, velocity: Vec3) -> SandboxBody {
        let mut settings = BodySettings::dynamic(position).with_collider(
            ColliderId(0),
            ColliderDesc::new(ColliderShape::Sphere { radius: 0.5 }).with_material(PhysicsMaterial::new(0.0, 1.0)),
        );
        settings.linear_velocity = velocity;
        let mut body = SandboxBody::new(BodyHandle::new(index, 0), &settings, 0);
        body.in_simulation = true;
        body.active = true;
        body
    }

    #[test]
    fn test_separated_spheres_do_not_overlap() {
        let a = ball(0, Vec3::ZERO, Vec3::ZERO);
        let b = ball(1, Vec3::new(1.5, 0.0, 0.0), Vec3::ZERO);
        assert!(overlap(&a, &b).is_none());
    }

    #[test]
    fn test_elastic_head_on_swaps_velocities() {
        let mut a = ball(0, Vec3::ZERO, Vec3::X);
        let mut b = ball(1, Vec3::new(0.9, 0.0, 0.0), -Vec3::X);
        let hit = overlap(&a, &b).unwrap();
        assert!((hit.depth - 0.1).abs() < 1e-5);

        let settings = ContactSettings {
            combined_friction: 0.0,
            combined_restitution: 1.0,
        };
        resolve(&mut a, &mut b, &hit, settings);
        assert!((a.linear_velocity.x + 1.0).abs() < 1e-5);
        assert!((b.linear_velocity.x - 1.0).abs() < 1e-5);
        assert!(b.position.x - a.position.x >= 1.0 - 1e-5);
    }

    #[test]
    fn test_two_static_bodies_never_collide() {
        let mut a = ball(0, Vec3::ZERO, Vec3::ZERO);
        let mut b = ball(1, Vec3::ZERO, Vec3::ZERO);
        a.motion_type = MotionType::Static;
        b.motion_type = MotionType::Kinematic;
        assert!(!may_collide(&a, &b));
    }
}
