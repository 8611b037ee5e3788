//! Scene builders shared by the physics benchmarks.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rein_impulse::{BodyDesc, Collider, PhysicsConfig, PhysicsWorld, Transform};

/// A static ground slab whose top face sits at y = 0.
pub fn spawn_ground(world: &mut hecs::World, config: &PhysicsConfig, half_width: f32) -> hecs::Entity {
    BodyDesc::fixed()
        .spawn(
            world,
            config,
            Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
            Collider::cuboid(Vec3::new(half_width, 0.5, half_width)),
        )
        .expect("ground is valid")
}

/// `n` dynamic spheres packed densely in a cube so many AABBs overlap.
pub fn setup_sphere_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let config = PhysicsConfig::default();
    let mut rng = StdRng::seed_from_u64(7);
    let extent = (n as f32).cbrt() * 1.5;
    for _ in 0..n {
        let position = Vec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(0.0..2.0 * extent),
            rng.gen_range(-extent..extent),
        );
        BodyDesc::dynamic(1.0)
            .spawn(&mut world, &config, Transform::from_position(position), Collider::sphere(0.5))
            .expect("sphere is valid");
    }
    world
}

/// Boxes, spheres and capsules mixed, densely packed.
pub fn setup_mixed_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let config = PhysicsConfig::default();
    let mut rng = StdRng::seed_from_u64(11);
    let extent = (n as f32).cbrt() * 1.5;
    for i in 0..n {
        let position = Vec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(0.0..2.0 * extent),
            rng.gen_range(-extent..extent),
        );
        let collider = match i % 3 {
            0 => Collider::sphere(0.5),
            1 => Collider::cuboid(Vec3::splat(0.4)),
            _ => Collider::capsule(0.3, 0.25),
        };
        BodyDesc::dynamic(1.0)
            .spawn(&mut world, &config, Transform::from_position(position), collider)
            .expect("shape is valid");
    }
    world
}

/// Spheres spread far apart: the AABB margin still makes them candidates,
/// but GJK rejects every pair early.
pub fn setup_sparse_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let config = PhysicsConfig::default();
    for i in 0..n {
        let position = Vec3::new(i as f32 * 3.0, 0.0, 0.0);
        BodyDesc::dynamic(1.0)
            .spawn(&mut world, &config, Transform::from_position(position), Collider::sphere(0.5))
            .expect("sphere is valid");
    }
    world
}

/// Ground plus a grid of `n` boxes resting just inside it, ready to step.
pub fn setup_scene(n: usize) -> (hecs::World, PhysicsWorld) {
    let config = PhysicsConfig::default();
    let mut world = hecs::World::new();
    let side = (n as f32).sqrt().ceil() as usize;
    spawn_ground(&mut world, &config, side as f32 * 1.5 + 1.0);

    for i in 0..n {
        let x = (i % side) as f32 * 1.5 - side as f32 * 0.75;
        let z = (i / side) as f32 * 1.5 - side as f32 * 0.75;
        BodyDesc::dynamic(1.0)
            .spawn(
                &mut world,
                &config,
                Transform::from_position(Vec3::new(x, 0.45, z)),
                Collider::cuboid(Vec3::splat(0.5)),
            )
            .expect("box is valid");
    }

    let physics = PhysicsWorld::new(config).expect("default config is valid");
    (world, physics)
}
