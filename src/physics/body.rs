//! Body construction: validated component bundles for dynamic and static
//! bodies.

use glam::Vec3;

use crate::ecs::components::physics::{
    AngularVelocity, Collider, ColliderShape, Contacts, Dynamic, Gravity, Impulse, Mass,
    PhysicsBody, Velocity,
};
use crate::ecs::components::transform::Transform;

use super::{PhysicsConfig, PhysicsError};

/// Restitution given to bodies that don't set one.
pub const DEFAULT_RESTITUTION: f32 = 0.9;

/// Diagonal inverse inertia of a solid box, from per-axis extents.
/// Axes with zero inertia get zero inverse inertia.
pub fn box_inverse_inertia(extents: Vec3, mass: f32) -> Vec3 {
    let factor = mass / 3.0;
    let sq = extents * extents;
    let inertia = Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * factor;
    let inv = |i: f32| if i != 0.0 { 1.0 / i } else { 0.0 };
    Vec3::new(inv(inertia.x), inv(inertia.y), inv(inertia.z))
}

/// Diagonal inverse inertia of a solid sphere.
pub fn sphere_inverse_inertia(radius: f32, mass: f32) -> Vec3 {
    let inertia = 0.4 * mass * radius * radius;
    if inertia != 0.0 {
        Vec3::splat(1.0 / inertia)
    } else {
        Vec3::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BodyKind {
    Dynamic { mass: f32 },
    Fixed,
}

/// Builder for a physics body.
///
/// ```
/// use rein_impulse::{BodyDesc, Collider, PhysicsConfig, Transform};
/// use rein_impulse::glam::Vec3;
///
/// let mut world = rein_impulse::hecs::World::new();
/// let config = PhysicsConfig::default();
/// let ball = BodyDesc::dynamic(2.0)
///     .with_restitution(0.5)
///     .spawn(&mut world, &config, Transform::from_position(Vec3::Y), Collider::sphere(0.5))
///     .unwrap();
/// assert!(world.contains(ball));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    kind: BodyKind,
    restitution: f32,
    inverse_inertia: Option<Vec3>,
    gravity: Option<Option<Vec3>>,
    velocity: Vec3,
    angular_velocity: Vec3,
}

impl BodyDesc {
    /// A body moved by the dynamics passes.
    pub fn dynamic(mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic { mass },
            restitution: DEFAULT_RESTITUTION,
            inverse_inertia: None,
            gravity: None,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// An immovable body. It collides and records contacts but is never
    /// integrated.
    pub fn fixed() -> Self {
        Self {
            kind: BodyKind::Fixed,
            ..Self::dynamic(1.0)
        }
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Override the inverse inertia derived from the collider.
    pub fn with_inverse_inertia(mut self, inverse_inertia: Vec3) -> Self {
        self.inverse_inertia = Some(inverse_inertia);
        self
    }

    /// Use `gravity` instead of [`PhysicsConfig::gravity`].
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = Some(Some(gravity));
        self
    }

    /// Don't attach a [`Gravity`] component.
    pub fn without_gravity(mut self) -> Self {
        self.gravity = Some(None);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, BodyKind::Dynamic { .. })
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if let BodyKind::Dynamic { mass } = self.kind {
            if !(mass.is_finite() && mass > 0.0) {
                return Err(PhysicsError::InvalidMass(mass));
            }
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(PhysicsError::InvalidRestitution(self.restitution));
        }
        Ok(())
    }

    /// Validate and spawn the body with its full component set.
    pub fn spawn(
        &self,
        world: &mut hecs::World,
        config: &PhysicsConfig,
        transform: Transform,
        mut collider: Collider,
    ) -> Result<hecs::Entity, PhysicsError> {
        self.validate()?;
        collider.shape.validate()?;
        collider.refresh(&transform, config.aabb_margin);

        let mass = match self.kind {
            BodyKind::Dynamic { mass } => mass,
            BodyKind::Fixed => 0.0,
        };
        let inverse_inertia = self
            .inverse_inertia
            .unwrap_or_else(|| shape_inverse_inertia(&collider.shape, mass));

        let mut builder = hecs::EntityBuilder::new();
        builder.add(transform).add(collider).add(Contacts::default()).add(PhysicsBody {
            restitution: self.restitution,
            inverse_inertia,
        });

        if self.is_dynamic() {
            builder
                .add(Mass(mass))
                .add(Velocity(self.velocity))
                .add(AngularVelocity(self.angular_velocity))
                .add(Impulse::default())
                .add(Dynamic::default());
            if let Some(gravity) = self.gravity.unwrap_or(Some(config.gravity)) {
                builder.add(Gravity(gravity));
            }
        }

        let entity = world.spawn(builder.build());
        tracing::trace!(?entity, dynamic = self.is_dynamic(), shape = ?collider.shape, "spawned body");
        Ok(entity)
    }
}

fn shape_inverse_inertia(shape: &ColliderShape, mass: f32) -> Vec3 {
    match *shape {
        ColliderShape::Sphere { radius } => sphere_inverse_inertia(radius, mass),
        ColliderShape::Box { .. } | ColliderShape::Capsule { .. } => {
            box_inverse_inertia(shape.local_half_extents(), mass)
        }
        ColliderShape::Plane | ColliderShape::Unsupported => Vec3::ZERO,
    }
}
