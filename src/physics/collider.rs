//! Collider shape support functions for collision detection.

use glam::{Mat3, Mat4, Vec3};

use crate::ecs::components::physics::{Collider, ColliderShape};
use crate::ecs::components::transform::Transform;

use super::PhysicsError;

/// Axis-aligned bounding box for broadphase collision detection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    /// Test whether two AABBs overlap. Touching boxes count as overlapping.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

impl ColliderShape {
    /// Whether GJK/EPA can query this shape.
    #[inline]
    pub fn has_support(&self) -> bool {
        !matches!(self, ColliderShape::Plane | ColliderShape::Unsupported)
    }

    /// Local-space half extents of a box enclosing the shape.
    pub fn local_half_extents(&self) -> Vec3 {
        match *self {
            ColliderShape::Box { half_extents } => half_extents,
            ColliderShape::Sphere { radius } => Vec3::splat(radius),
            ColliderShape::Capsule {
                half_height,
                radius,
            } => Vec3::new(radius, half_height, radius),
            ColliderShape::Plane | ColliderShape::Unsupported => Vec3::ZERO,
        }
    }

    /// Reject non-finite or non-positive dimensions.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let ok = match *self {
            ColliderShape::Box { half_extents } => {
                half_extents.is_finite() && half_extents.cmpgt(Vec3::ZERO).all()
            }
            ColliderShape::Sphere { radius } => radius.is_finite() && radius > 0.0,
            ColliderShape::Capsule {
                half_height,
                radius,
            } => {
                half_height.is_finite() && radius.is_finite() && half_height >= 0.0 && radius > 0.0
            }
            ColliderShape::Plane | ColliderShape::Unsupported => true,
        };
        if ok {
            Ok(())
        } else {
            Err(PhysicsError::InvalidShape(format!("{self:?}")))
        }
    }
}

impl Collider {
    /// Re-derive the cached matrices and world AABB from `transform`.
    ///
    /// The AABB half extents are the shape's local bounds scaled up by
    /// `margin`, so they enclose every support point for any `margin >= 1`.
    pub fn refresh(&mut self, transform: &Transform, margin: f32) {
        self.local_to_world = transform.to_matrix();
        self.world_to_local = self.local_to_world.inverse();
        self.aabb = aabb_from_extents(self.shape.local_half_extents() * margin, self.local_to_world);
    }

    /// GJK/EPA support function. Returns the world point farthest along
    /// `direction`.
    ///
    /// Round shapes are queried in local space: the direction goes through
    /// the transpose of the linear part of `local_to_world`, which stays
    /// exact under non-uniform scale. A scaled sphere is an ellipsoid.
    ///
    /// Shapes without support (see [`ColliderShape::has_support`]) return
    /// their reference point.
    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let mat = self.local_to_world;

        match self.shape {
            ColliderShape::Box { half_extents } => box_support(half_extents, mat, direction),
            ColliderShape::Sphere { radius } => {
                let local_dir = local_direction(mat, direction);
                mat.transform_point3(local_dir.normalize_or_zero() * radius)
            }
            ColliderShape::Capsule {
                half_height,
                radius,
            } => {
                let local_dir = local_direction(mat, direction);
                let xz = Vec3::new(local_dir.x, 0.0, local_dir.z).normalize_or_zero() * radius;
                let y = if local_dir.y > 0.0 {
                    half_height
                } else {
                    -half_height
                };
                mat.transform_point3(Vec3::new(xz.x, y, xz.z))
            }
            ColliderShape::Plane | ColliderShape::Unsupported => self.position(),
        }
    }
}

/// Farthest of the eight transformed corners along `direction`.
#[inline]
fn box_support(half: Vec3, mat: Mat4, direction: Vec3) -> Vec3 {
    let mut best = mat.transform_point3(-half);
    let mut best_dot = f32::NEG_INFINITY;

    for i in 0..8 {
        let corner = Vec3::new(
            if i & 1 == 0 { -half.x } else { half.x },
            if i & 2 == 0 { -half.y } else { half.y },
            if i & 4 == 0 { -half.z } else { half.z },
        );
        let world = mat.transform_point3(corner);
        let d = world.dot(direction);
        if d > best_dot {
            best_dot = d;
            best = world;
        }
    }
    best
}

/// Pull a world direction back into the shape's local frame.
#[inline]
fn local_direction(mat: Mat4, direction: Vec3) -> Vec3 {
    Mat3::from_mat4(mat).transpose() * direction
}

/// Compute world-space AABB from local half-extents and a transform matrix.
#[inline]
fn aabb_from_extents(half_extents: Vec3, mat: Mat4) -> PhysicsAabb {
    let center = mat.transform_point3(Vec3::ZERO);

    // For each world axis, compute the extent by projecting the local box axes
    let abs_col0 = mat.x_axis.truncate().abs();
    let abs_col1 = mat.y_axis.truncate().abs();
    let abs_col2 = mat.z_axis.truncate().abs();

    let extent = abs_col0 * half_extents.x + abs_col1 * half_extents.y + abs_col2 * half_extents.z;

    PhysicsAabb {
        min: center - extent,
        max: center + extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn refreshed(mut collider: Collider, transform: Transform) -> Collider {
        collider.refresh(&transform, 1.0);
        collider
    }

    #[test]
    fn test_sphere_aabb() {
        let c = refreshed(
            Collider::sphere(1.0),
            Transform::from_position(Vec3::new(0.0, 5.0, 0.0)),
        );

        let eps = 1e-5;
        assert!((c.aabb.min - Vec3::new(-1.0, 4.0, -1.0)).length() < eps);
        assert!((c.aabb.max - Vec3::new(1.0, 6.0, 1.0)).length() < eps);
    }

    #[test]
    fn test_box_aabb_with_margin() {
        let mut c = Collider::cuboid(Vec3::new(1.0, 2.0, 3.0));
        c.refresh(&Transform::identity(), 10.0);

        let eps = 1e-4;
        assert!((c.aabb.min - Vec3::new(-10.0, -20.0, -30.0)).length() < eps);
        assert!((c.aabb.max - Vec3::new(10.0, 20.0, 30.0)).length() < eps);
    }

    #[test]
    fn test_aabb_overlap() {
        let a = PhysicsAabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let b = PhysicsAabb {
            min: Vec3::new(0.5, 0.5, 0.5),
            max: Vec3::new(2.0, 2.0, 2.0),
        };
        let c = PhysicsAabb {
            min: Vec3::new(2.0, 2.0, 2.0),
            max: Vec3::new(3.0, 3.0, 3.0),
        };
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
        // Shared face counts as overlap.
        assert!(b.overlaps(&c));
    }

    #[test]
    fn test_sphere_support() {
        let c = refreshed(
            Collider::sphere(2.0),
            Transform::from_position(Vec3::new(0.0, 5.0, 0.0)),
        );
        let eps = 1e-5;
        assert!((c.support(Vec3::Y) - Vec3::new(0.0, 7.0, 0.0)).length() < eps);
        // Zero direction falls back to the center.
        assert!((c.support(Vec3::ZERO) - Vec3::new(0.0, 5.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_box_support_picks_corner() {
        let c = refreshed(
            Collider::cuboid(Vec3::new(1.0, 2.0, 3.0)),
            Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),
        );
        let p = c.support(Vec3::new(1.0, -1.0, 1.0));
        assert!((p - Vec3::new(11.0, -2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_rotated_box_support() {
        let c = refreshed(
            Collider::cuboid(Vec3::new(2.0, 0.5, 0.5)),
            Transform::identity().with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
        );
        // The long axis now points along world Y.
        let p = c.support(Vec3::Y);
        assert!((p.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_capsule_support() {
        let c = refreshed(
            Collider::capsule(1.0, 0.5),
            Transform::from_position(Vec3::new(0.0, 3.0, 0.0)),
        );
        let eps = 1e-5;
        let up = c.support(Vec3::new(1.0, 1.0, 0.0));
        assert!((up - Vec3::new(0.5, 4.0, 0.0)).length() < eps);
        let down = c.support(Vec3::new(0.0, -1.0, -1.0));
        assert!((down - Vec3::new(0.0, 2.0, -0.5)).length() < eps);
        // Straight up has no XZ component: the point sits on the axis.
        let top = c.support(Vec3::Y);
        assert!((top - Vec3::new(0.0, 4.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_support_points_inside_aabb() {
        let shapes = [
            Collider::cuboid(Vec3::new(0.5, 1.0, 1.5)),
            Collider::sphere(0.75),
            Collider::capsule(1.0, 0.25),
        ];
        let transform = Transform::from_position(Vec3::new(1.0, -2.0, 3.0))
            .with_rotation(Quat::from_euler(glam::EulerRot::XYZ, 0.3, 1.1, -0.7));
        let dirs = [
            Vec3::X,
            Vec3::NEG_Y,
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-0.3, 0.2, -0.9),
        ];

        let stretched = transform.with_scale(Vec3::new(1.0, 3.0, 0.5));

        for collider in shapes {
            for t in [transform, stretched] {
                let c = refreshed(collider, t);
                for d in dirs {
                    let p = c.support(d);
                    let slack = PhysicsAabb {
                        min: c.aabb.min - Vec3::splat(1e-4),
                        max: c.aabb.max + Vec3::splat(1e-4),
                    };
                    assert!(slack.contains_point(p), "{:?} support {p} escapes {:?}", c.shape, c.aabb);
                }
            }
        }
    }

    #[test]
    fn test_scaled_sphere_is_an_ellipsoid() {
        let c = refreshed(
            Collider::sphere(1.0),
            Transform::identity().with_scale(Vec3::new(1.0, 3.0, 1.0)),
        );
        let eps = 1e-5;
        assert!((c.support(Vec3::X) - Vec3::X).length() < eps);
        assert!((c.support(Vec3::Y) - Vec3::new(0.0, 3.0, 0.0)).length() < eps);
        assert!((c.aabb.max - Vec3::new(1.0, 3.0, 1.0)).length() < eps);
    }

    #[test]
    fn test_support_is_farthest_under_nonuniform_scale() {
        let shapes = [
            Collider::cuboid(Vec3::new(0.5, 1.0, 1.5)),
            Collider::sphere(0.75),
            Collider::capsule(1.0, 0.25),
        ];
        let transform = Transform::from_position(Vec3::new(-2.0, 1.0, 0.5))
            .with_rotation(Quat::from_euler(glam::EulerRot::XYZ, 0.3, 1.1, -0.7))
            .with_scale(Vec3::new(2.0, 0.5, 1.5));

        // Sampled directions. Every support point is a point of
        // the shape, so none may beat the support along its own direction.
        let mut dirs = Vec::new();
        for i in 0..12 {
            for j in 0..6 {
                let (theta, phi) = (i as f32 * 0.52, j as f32 * 0.5 - 1.3);
                dirs.push(Vec3::new(phi.cos() * theta.cos(), phi.sin(), phi.cos() * theta.sin()));
            }
        }

        for collider in shapes {
            let c = refreshed(collider, transform);
            for &d in &dirs {
                let best = c.support(d).dot(d);
                for &other in &dirs {
                    let reach = c.support(other).dot(d);
                    assert!(
                        reach <= best + 1e-4,
                        "{:?}: support({d}) = {best} beaten by {reach}",
                        c.shape
                    );
                }
            }
        }
    }

    #[test]
    fn test_shape_validation() {
        assert!(ColliderShape::Sphere { radius: 1.0 }.validate().is_ok());
        assert!(ColliderShape::Sphere { radius: 0.0 }.validate().is_err());
        assert!(ColliderShape::Box {
            half_extents: Vec3::new(1.0, f32::NAN, 1.0)
        }
        .validate()
        .is_err());
        assert!(ColliderShape::Plane.validate().is_ok());
        assert!(!ColliderShape::Plane.has_support());
        assert!(!ColliderShape::Unsupported.has_support());
    }
}
