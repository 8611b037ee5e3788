//! Rigid body integration passes.
//!
//! Each pass is a full query over the world. Only entities marked
//! [`Dynamic`] are moved; everything else is immovable.

use glam::{Quat, Vec3};

use crate::ecs::components::physics::{
    AngularVelocity, Dynamic, Gravity, Impulse, Mass, Velocity,
};
use crate::ecs::components::transform::Transform;

/// `v += force / mass * dt`.
#[inline]
pub fn apply_force(velocity: &mut Vec3, force: Vec3, mass: f32, dt: f32) {
    *velocity += force / mass * dt;
}

/// Integrate an orientation by angular velocity `omega` over `dt`:
/// q' = normalize(q + 0.5 * dt * q * omega).
#[inline]
pub fn integrate_rotation(rotation: Quat, omega: Vec3, dt: f32) -> Quat {
    if omega.length_squared() <= 1e-12 {
        return rotation;
    }
    let omega_quat = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0);
    let q_dot = rotation * omega_quat;
    (rotation + q_dot * (0.5 * dt)).normalize()
}

/// Zero the impulse accumulators and drop `grounded` on bodies that are
/// clearly moving vertically.
pub fn reset_impulses(world: &mut hecs::World, grounded_velocity_threshold: f32) {
    for (_, (impulse, dynamic, velocity)) in
        world.query_mut::<(&mut Impulse, &mut Dynamic, &Velocity)>()
    {
        *impulse = Impulse::default();
        if velocity.0.y.abs() > grounded_velocity_threshold {
            dynamic.grounded = false;
        }
    }
}

/// Apply per-entity gravity to velocity.
pub fn apply_gravity(world: &mut hecs::World, dt: f32) {
    for (_, (velocity, mass, gravity)) in
        world.query_mut::<(&mut Velocity, &Mass, &Gravity)>().with::<&Dynamic>()
    {
        apply_force(&mut velocity.0, gravity.0 * mass.0, mass.0, dt);
    }
}

/// Consume jump requests: replace vertical velocity with a one-tick upward
/// force.
pub fn apply_jumps(world: &mut hecs::World, jump_force: f32, dt: f32) {
    for (_, (velocity, mass, dynamic)) in
        world.query_mut::<(&mut Velocity, &Mass, &mut Dynamic)>()
    {
        if !dynamic.jumped {
            continue;
        }
        velocity.0.y = 0.0;
        apply_force(&mut velocity.0, Vec3::new(0.0, jump_force, 0.0), mass.0, dt);
        dynamic.jumped = false;
    }
}

/// Fold accumulated impulses into velocities.
pub fn integrate_impulses(world: &mut hecs::World) {
    for (_, (velocity, angular, impulse)) in world
        .query_mut::<(&mut Velocity, &mut AngularVelocity, &Impulse)>()
        .with::<&Dynamic>()
    {
        velocity.0 += impulse.linear;
        angular.0 += impulse.angular;
    }
}

/// Integrate positions and orientations.
pub fn integrate_motion(world: &mut hecs::World, dt: f32) {
    for (_, (transform, velocity, angular)) in world
        .query_mut::<(&mut Transform, &Velocity, &AngularVelocity)>()
        .with::<&Dynamic>()
    {
        transform.position += velocity.0 * dt;
        transform.rotation = integrate_rotation(transform.rotation, angular.0, dt);
    }
}
