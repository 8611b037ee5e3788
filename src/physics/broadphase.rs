//! Broadphase collision detection using AABB overlap tests, plus pair
//! dispatch into the narrowphase.

use rayon::prelude::*;

use crate::ecs::components::physics::{Collider, Contacts};
use crate::ecs::components::transform::Transform;

use super::contact::{ContactAppend, ContactLog};
use super::narrowphase::detect_collision;
use super::PhysicsConfig;

/// Below this many colliders pair tests run on the calling thread.
pub const PARALLEL_PAIR_THRESHOLD: usize = 64;

/// Refresh collider caches from transforms.
pub fn refresh_colliders(world: &mut hecs::World, aabb_margin: f32) {
    for (_, (collider, transform)) in world.query_mut::<(&mut Collider, &Transform)>() {
        collider.refresh(transform, aabb_margin);
    }
}

/// Empty every contact buffer.
pub fn clear_contacts(world: &mut hecs::World) {
    for (_, contacts) in world.query_mut::<&mut Contacts>() {
        contacts.clear();
    }
}

/// Test every unordered pair in `entries` and log both halves of each
/// contact found. The log order matches a sequential `i < j` sweep
/// regardless of threading.
pub fn find_contacts(entries: &[(hecs::Entity, Collider)], config: &PhysicsConfig) -> ContactLog {
    let n = entries.len();
    if n < PARALLEL_PAIR_THRESHOLD {
        (0..n).flat_map(|i| test_row(entries, i, config)).collect()
    } else {
        let appends: Vec<ContactAppend> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| test_row(entries, i, config))
            .collect();
        ContactLog::from_iter(appends)
    }
}

/// Pair tests of `entries[i]` against every later entry.
fn test_row<'a>(
    entries: &'a [(hecs::Entity, Collider)],
    i: usize,
    config: &'a PhysicsConfig,
) -> impl Iterator<Item = ContactAppend> + 'a {
    let (entity_a, collider_a) = &entries[i];
    entries[i + 1..]
        .iter()
        .filter(move |(_, collider_b)| collider_a.aabb.overlaps(&collider_b.aabb))
        .filter_map(move |(entity_b, collider_b)| {
            let data = detect_collision(collider_a, collider_b, config)?;
            let is_trigger = collider_a.is_trigger || collider_b.is_trigger;
            Some(ContactAppend::pair(*entity_a, *entity_b, data, is_trigger))
        })
        .flatten()
}

/// Run the whole broadphase for one tick: refresh caches, clear buffers,
/// test pairs, commit.
pub fn update_contacts(world: &mut hecs::World, config: &PhysicsConfig) {
    refresh_colliders(world, config.aabb_margin);
    clear_contacts(world);

    let entries: Vec<(hecs::Entity, Collider)> = world
        .query::<(&Collider, &Transform)>()
        .iter()
        .map(|(entity, (collider, _))| (entity, *collider))
        .collect();

    let log = find_contacts(&entries, config);
    let logged = log.len();
    let written = log.commit(world);

    tracing::debug!(
        colliders = entries.len(),
        contacts = logged / 2,
        written,
        "broadphase complete"
    );
}
