//! Physics components for ECS entities.

use glam::{Mat4, Vec3};

use crate::physics::collider::PhysicsAabb;
use crate::physics::contact::ContactRecord;

/// Collider shape.
///
/// `Plane` and `Unsupported` exist so scenes can carry them, but they have no
/// support function: pairs involving them never produce contacts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Y-aligned; `half_height` is the offset of the cap and base planes.
    Capsule { half_height: f32, radius: f32 },
    Plane,
    Unsupported,
}

/// Collision detection component.
///
/// `aabb`, `local_to_world` and `world_to_local` are caches refreshed from the
/// entity's [`Transform`](super::Transform) at the start of every tick.
#[derive(Debug, Clone, Copy)]
pub struct Collider {
    pub shape: ColliderShape,
    /// If true, contacts are reported but never resolved.
    pub is_trigger: bool,
    pub aabb: PhysicsAabb,
    pub local_to_world: Mat4,
    pub world_to_local: Mat4,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            is_trigger: false,
            aabb: PhysicsAabb::default(),
            local_to_world: Mat4::IDENTITY,
            world_to_local: Mat4::IDENTITY,
        }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ColliderShape::Box { half_extents })
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(ColliderShape::Sphere { radius })
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::new(ColliderShape::Capsule {
            half_height,
            radius,
        })
    }

    pub fn plane() -> Self {
        Self::new(ColliderShape::Plane)
    }

    pub fn with_trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    /// World-space reference point (the transform origin).
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.local_to_world.w_axis.truncate()
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::sphere(0.5)
    }
}

/// Material and inertia data of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody {
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    /// Diagonal of the body-local inverse inertia tensor.
    pub inverse_inertia: Vec3,
}

/// Body mass. Always > 0 when created through [`BodyDesc`](crate::BodyDesc).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mass(pub f32);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub Vec3);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AngularVelocity(pub Vec3);

/// Per-entity gravitational acceleration. Bodies without it float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity(pub Vec3);

/// Impulses accumulated during the current tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Impulse {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// Marks a body the dynamics passes may move, plus its gameplay flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dynamic {
    /// Set when a contact normal points mostly up; read by gameplay.
    pub grounded: bool,
    /// Jump request set by gameplay; consumed by the jump pass.
    pub jumped: bool,
}

/// Contacts found for this entity during the current tick.
#[derive(Debug, Clone, Default)]
pub struct Contacts(pub Vec<ContactRecord>);

impl Contacts {
    pub fn iter(&self) -> impl Iterator<Item = &ContactRecord> {
        self.0.iter()
    }

    /// Contacts that take part in the response (non-triggers).
    pub fn solid(&self) -> impl Iterator<Item = &ContactRecord> {
        self.0.iter().filter(|c| !c.is_trigger)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn push(&mut self, record: ContactRecord) {
        self.0.push(record);
    }

    /// Whether any contact this tick involves `other`.
    pub fn touches(&self, other: hecs::Entity) -> bool {
        self.0.iter().any(|c| c.other == other)
    }
}
