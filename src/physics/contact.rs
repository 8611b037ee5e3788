//! Contact data structures and the per-tick contact log.

use glam::Vec3;

use crate::ecs::components::physics::Contacts;

/// Geometry of a single contact between shape A and shape B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactData {
    /// Witness point on A, world space.
    pub point_a: Vec3,
    /// Witness point on B, world space.
    pub point_b: Vec3,
    /// Unit normal pointing from B toward A. Moving A by `normal * depth`
    /// separates the shapes.
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
    /// Tangent basis perpendicular to `normal`. Not used by the solver.
    pub tangent_a: Vec3,
    pub tangent_b: Vec3,
}

impl ContactData {
    pub fn new(point_a: Vec3, point_b: Vec3, normal: Vec3, depth: f32) -> Self {
        let (tangent_a, tangent_b) = normal.any_orthonormal_pair();
        Self {
            point_a,
            point_b,
            normal,
            depth,
            tangent_a,
            tangent_b,
        }
    }

    /// The same contact seen from B: normal negated, witness points swapped.
    pub fn mirrored(&self) -> Self {
        Self {
            point_a: self.point_b,
            point_b: self.point_a,
            normal: -self.normal,
            depth: self.depth,
            tangent_a: self.tangent_b,
            tangent_b: self.tangent_a,
        }
    }
}

/// A contact as stored in an entity's [`Contacts`] buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactRecord {
    pub other: hecs::Entity,
    pub data: ContactData,
    /// Either collider was a trigger.
    pub is_trigger: bool,
}

/// Intent to append `record` to `target`'s contact buffer.
#[derive(Debug, Clone, Copy)]
pub struct ContactAppend {
    pub target: hecs::Entity,
    pub record: ContactRecord,
}

impl ContactAppend {
    /// Both halves of a contact between `a` and `b`, in that order.
    pub fn pair(
        a: hecs::Entity,
        b: hecs::Entity,
        data: ContactData,
        is_trigger: bool,
    ) -> [ContactAppend; 2] {
        [
            ContactAppend {
                target: a,
                record: ContactRecord {
                    other: b,
                    data,
                    is_trigger,
                },
            },
            ContactAppend {
                target: b,
                record: ContactRecord {
                    other: a,
                    data: data.mirrored(),
                    is_trigger,
                },
            },
        ]
    }
}

/// Append-only log of contact intents produced during the pair-test phase.
///
/// Producers never touch entity buffers; [`ContactLog::commit`] is the single
/// point where the log is applied to the world.
#[derive(Debug, Default)]
pub struct ContactLog {
    entries: Vec<ContactAppend>,
}

impl ContactLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, append: ContactAppend) {
        self.entries.push(append);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContactAppend> {
        self.entries.iter()
    }

    /// Apply every logged append to its target's [`Contacts`] buffer, in log
    /// order. Targets that lost their buffer (or were despawned) are skipped.
    /// Returns the number of records written.
    pub fn commit(self, world: &mut hecs::World) -> usize {
        let mut written = 0;
        for append in self.entries {
            match world.get::<&mut Contacts>(append.target) {
                Ok(mut contacts) => {
                    contacts.push(append.record);
                    written += 1;
                }
                Err(err) if dropped_contact_level(&err) == tracing::Level::WARN => {
                    tracing::warn!(
                        entity = ?append.target,
                        other = ?append.record.other,
                        %err,
                        "dropping contact for despawned entity"
                    );
                }
                Err(err) => {
                    tracing::debug!(
                        entity = ?append.target,
                        other = ?append.record.other,
                        %err,
                        "dropping contact for entity without a contact buffer"
                    );
                }
            }
        }
        written
    }
}

/// Log level for an append that could not be written. Static geometry
/// without a buffer is routine; a despawned target is not.
fn dropped_contact_level(err: &hecs::ComponentError) -> tracing::Level {
    match err {
        hecs::ComponentError::NoSuchEntity => tracing::Level::WARN,
        hecs::ComponentError::MissingComponent(_) => tracing::Level::DEBUG,
    }
}

impl FromIterator<ContactAppend> for ContactLog {
    fn from_iter<I: IntoIterator<Item = ContactAppend>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<ContactAppend> for ContactLog {
    fn extend<I: IntoIterator<Item = ContactAppend>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}
