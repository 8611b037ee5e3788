//! Narrowphase collision detection: GJK intersection and EPA contact
//! extraction for convex colliders.

pub mod epa;
pub mod gjk;

use glam::Vec3;

use crate::ecs::components::physics::Collider;

use super::contact::ContactData;
use super::PhysicsConfig;

/// A point of the Minkowski difference `B - A`, with the witness points on
/// each shape that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportPoint {
    pub v: Vec3,
    pub a: Vec3,
    pub b: Vec3,
}

/// Minkowski difference support function.
#[inline]
pub fn minkowski_support(a: &Collider, b: &Collider, direction: Vec3) -> SupportPoint {
    let pa = a.support(-direction);
    let pb = b.support(direction);
    SupportPoint {
        v: pb - pa,
        a: pa,
        b: pb,
    }
}

/// Detect collision between two colliders with GJK followed by EPA.
///
/// The returned normal points from `b` toward `a`. Pairs where either shape
/// has no support function never collide.
pub fn detect_collision(a: &Collider, b: &Collider, config: &PhysicsConfig) -> Option<ContactData> {
    if !a.shape.has_support() || !b.shape.has_support() {
        tracing::trace!(a = ?a.shape, b = ?b.shape, "skipping pair without support function");
        return None;
    }

    let tetrahedron = gjk::intersect(a, b, config.gjk_max_iterations)?;
    let result = epa::penetration(
        &tetrahedron,
        a,
        b,
        config.epa_max_iterations,
        config.epa_growth_tolerance,
    )?;

    if !result.converged && !config.accept_unconverged_contacts {
        tracing::trace!(
            iterations = result.iterations,
            depth = result.contact.depth,
            "discarding unconverged epa contact"
        );
        return None;
    }

    Some(result.contact)
}
