//! Single-pass impulse contact response and positional correction.

use glam::Vec3;

use crate::ecs::components::physics::{
    AngularVelocity, Contacts, Dynamic, Impulse, Mass, PhysicsBody, Velocity,
};
use crate::ecs::components::transform::Transform;

use super::contact::ContactRecord;
use super::PhysicsConfig;

/// Kinematic state of a contact partner. Missing components read as an
/// immovable body at rest.
#[derive(Debug, Clone, Copy, Default)]
struct Partner {
    velocity: Vec3,
    angular_velocity: Vec3,
    lever: Vec3,
}

impl Partner {
    fn read(world: &hecs::World, record: &ContactRecord) -> Self {
        let velocity = world
            .get::<&Velocity>(record.other)
            .map_or(Vec3::ZERO, |v| v.0);
        let angular_velocity = world
            .get::<&AngularVelocity>(record.other)
            .map_or(Vec3::ZERO, |w| w.0);
        let lever = world
            .get::<&Transform>(record.other)
            .map_or(Vec3::ZERO, |t| record.data.point_b - t.position);
        Self {
            velocity,
            angular_velocity,
            lever,
        }
    }
}

/// Baumgarte bias for a penetration of `depth`.
#[inline]
pub fn penetration_bias(depth: f32, beta: f32, slop: f32, dt: f32) -> f32 {
    if depth > slop {
        -(beta / dt) * (depth - slop).max(0.0)
    } else {
        0.0
    }
}

/// Accumulate contact impulses on every dynamic body and update its
/// `grounded` flag. Triggers are ignored.
pub fn resolve_contacts(world: &mut hecs::World, config: &PhysicsConfig, dt: f32) {
    let world = &*world;
    let mut query = world.query::<(
        &Contacts,
        &Transform,
        &Velocity,
        &AngularVelocity,
        &Mass,
        &PhysicsBody,
        &mut Impulse,
        &mut Dynamic,
    )>();

    for (_, (contacts, transform, velocity, angular, mass, body, impulse, dynamic)) in query.iter() {
        let restitution = if config.use_body_restitution {
            body.restitution
        } else {
            config.contact_restitution
        };
        let inv_mass = 1.0 / mass.0;

        for record in contacts.solid() {
            let partner = Partner::read(world, record);
            let n = record.data.normal;
            let r_a = record.data.point_a - transform.position;

            let delta_v = (partner.velocity + partner.angular_velocity.cross(partner.lever))
                - (velocity.0 + angular.0.cross(r_a));
            let j_v = delta_v.dot(n);
            let bias = penetration_bias(
                record.data.depth,
                config.baumgarte_beta,
                config.penetration_slop,
                dt,
            );
            let lambda = -(j_v + bias);

            impulse.linear -= (1.0 + restitution) * inv_mass * n * lambda;

            if n.dot(Vec3::Y) > config.ground_normal_threshold {
                dynamic.grounded = true;
            }

            if config.apply_angular_impulse {
                impulse.angular += body.inverse_inertia * n.cross(r_a) * lambda;
            }
        }
    }
}

/// Push each dynamic body out along its contact normals by the full depth.
pub fn positional_correction(world: &mut hecs::World) {
    for (_, (contacts, transform)) in world
        .query_mut::<(&Contacts, &mut Transform)>()
        .with::<&Dynamic>()
    {
        let correction: Vec3 = contacts
            .solid()
            .map(|c| c.data.normal * c.data.depth)
            .sum();
        transform.position += correction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::contact::{ContactAppend, ContactData};

    fn dynamic_body(world: &mut hecs::World, position: Vec3, velocity: Vec3) -> hecs::Entity {
        world.spawn((
            Transform::from_position(position),
            Velocity(velocity),
            AngularVelocity::default(),
            Mass(1.0),
            PhysicsBody {
                restitution: 0.9,
                inverse_inertia: Vec3::splat(6.0),
            },
            Impulse::default(),
            Dynamic::default(),
            Contacts::default(),
        ))
    }

    fn ground(world: &mut hecs::World) -> hecs::Entity {
        world.spawn((Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),))
    }

    fn touch(world: &mut hecs::World, a: hecs::Entity, b: hecs::Entity, depth: f32, trigger: bool) {
        let data = ContactData::new(
            Vec3::new(0.0, -depth, 0.0),
            Vec3::ZERO,
            Vec3::Y,
            depth,
        );
        let [for_a, _] = ContactAppend::pair(a, b, data, trigger);
        world.get::<&mut Contacts>(a).unwrap().push(for_a.record);
    }

    #[test]
    fn test_penetration_bias() {
        let dt = 1.0 / 60.0;
        assert_eq!(penetration_bias(0.005, 0.02, 0.01, dt), 0.0);
        let b = penetration_bias(0.11, 0.02, 0.01, dt);
        assert!((b - -(0.02 * 60.0) * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_falling_body_gets_upward_impulse() {
        let mut world = hecs::World::new();
        let a = dynamic_body(&mut world, Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, -2.0, 0.0));
        let g = ground(&mut world);
        touch(&mut world, a, g, 0.005, false);

        let config = PhysicsConfig::default();
        resolve_contacts(&mut world, &config, 1.0 / 60.0);

        let impulse = world.get::<&Impulse>(a).unwrap();
        // jV = 2, no bias under slop: impulse = (1 + 0.2) * 2 upward.
        assert!((impulse.linear - Vec3::new(0.0, 2.4, 0.0)).length() < 1e-5);
        assert_eq!(impulse.angular, Vec3::ZERO);
        assert!(world.get::<&Dynamic>(a).unwrap().grounded);
    }

    #[test]
    fn test_body_restitution_flag() {
        let mut world = hecs::World::new();
        let a = dynamic_body(&mut world, Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let g = ground(&mut world);
        touch(&mut world, a, g, 0.0, false);

        let config = PhysicsConfig {
            use_body_restitution: true,
            ..Default::default()
        };
        resolve_contacts(&mut world, &config, 1.0 / 60.0);

        let impulse = world.get::<&Impulse>(a).unwrap();
        assert!((impulse.linear.y - 1.9).abs() < 1e-5);
    }

    #[test]
    fn test_moving_partner_velocity_is_used() {
        let mut world = hecs::World::new();
        let a = dynamic_body(&mut world, Vec3::new(0.0, 0.5, 0.0), Vec3::ZERO);
        let platform = world.spawn((
            Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
            Velocity(Vec3::new(0.0, 1.0, 0.0)),
        ));
        touch(&mut world, a, platform, 0.0, false);

        resolve_contacts(&mut world, &PhysicsConfig::default(), 1.0 / 60.0);
        let impulse = world.get::<&Impulse>(a).unwrap();
        assert!((impulse.linear.y - 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_triggers_are_ignored() {
        let mut world = hecs::World::new();
        let a = dynamic_body(&mut world, Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, -2.0, 0.0));
        let g = ground(&mut world);
        touch(&mut world, a, g, 0.2, true);

        resolve_contacts(&mut world, &PhysicsConfig::default(), 1.0 / 60.0);
        positional_correction(&mut world);

        assert_eq!(world.get::<&Impulse>(a).unwrap().linear, Vec3::ZERO);
        assert!(!world.get::<&Dynamic>(a).unwrap().grounded);
        assert_eq!(world.get::<&Transform>(a).unwrap().position.y, 0.5);
    }

    #[test]
    fn test_angular_impulse_flag() {
        let mut world = hecs::World::new();
        let a = dynamic_body(&mut world, Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0));
        let g = ground(&mut world);
        // Off-center contact so n x rA is non-zero.
        let data = ContactData::new(Vec3::new(0.5, -0.5, 0.0), Vec3::ZERO, Vec3::Y, 0.0);
        world
            .get::<&mut Contacts>(a)
            .unwrap()
            .push(ContactAppend::pair(a, g, data, false)[0].record);

        let config = PhysicsConfig {
            apply_angular_impulse: true,
            ..Default::default()
        };
        resolve_contacts(&mut world, &config, 1.0 / 60.0);
        let impulse = world.get::<&Impulse>(a).unwrap();
        assert!(impulse.angular.length() > 0.0);
        assert!(impulse.angular.z.abs() > 0.0);
    }

    #[test]
    fn test_positional_correction_sums_contacts() {
        let mut world = hecs::World::new();
        let a = dynamic_body(&mut world, Vec3::new(0.0, 0.4, 0.0), Vec3::ZERO);
        let g = ground(&mut world);
        touch(&mut world, a, g, 0.1, false);
        let wall = world.spawn((Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),));
        let data = ContactData::new(Vec3::ZERO, Vec3::ZERO, Vec3::NEG_X, 0.05);
        world
            .get::<&mut Contacts>(a)
            .unwrap()
            .push(ContactAppend::pair(a, wall, data, false)[0].record);

        positional_correction(&mut world);
        let p = world.get::<&Transform>(a).unwrap().position;
        assert!((p - Vec3::new(-0.05, 0.5, 0.0)).length() < 1e-6);
    }
}
