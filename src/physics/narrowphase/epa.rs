//! Expanding Polytope Algorithm: penetration depth, normal and witness
//! points from a GJK tetrahedron.

use glam::Vec3;

use crate::ecs::components::physics::Collider;
use crate::physics::contact::ContactData;

use super::gjk::Tetrahedron;
use super::{minkowski_support, SupportPoint};

/// EPA result.
#[derive(Debug, Clone, Copy)]
pub struct Penetration {
    /// False when the iteration cap was hit before the polytope stopped
    /// growing. The contact is then a best-effort estimate.
    pub converged: bool,
    pub iterations: u32,
    pub contact: ContactData,
}

#[derive(Debug, Clone, Copy)]
struct Face {
    indices: [usize; 3],
    /// Unit outward normal, or zero for a degenerate face.
    normal: Vec3,
}

#[derive(Debug, Clone)]
struct Polytope {
    vertices: Vec<SupportPoint>,
    faces: Vec<Face>,
}

impl Polytope {
    fn from_tetrahedron(t: &Tetrahedron) -> Self {
        let mut polytope = Self {
            vertices: vec![t.a, t.b, t.c, t.d],
            faces: Vec::with_capacity(16),
        };
        for [i, j, k] in [[0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2]] {
            let face = polytope.face(i, j, k);
            polytope.faces.push(face);
        }
        polytope
    }

    fn face(&self, i: usize, j: usize, k: usize) -> Face {
        let a = self.vertices[i].v;
        let b = self.vertices[j].v;
        let c = self.vertices[k].v;
        Face {
            indices: [i, j, k],
            normal: (b - a).cross(c - a).normalize_or_zero(),
        }
    }

    /// Face whose plane is nearest the origin, with that distance.
    fn closest_face(&self) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, face) in self.faces.iter().enumerate() {
            if face.normal == Vec3::ZERO {
                continue;
            }
            let distance = face.normal.dot(self.vertices[face.indices[0]].v);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }
        best
    }

    /// Add `point`, removing every face that sees it and stitching the
    /// silhouette back to it.
    fn expand(&mut self, point: SupportPoint) {
        let new_idx = self.vertices.len();
        self.vertices.push(point);

        let mut edges: Vec<[usize; 2]> = Vec::new();
        let vertices = &self.vertices;
        self.faces.retain(|face| {
            let [i, j, k] = face.indices;
            let visible = face.normal.dot(point.v - vertices[i].v) > 0.0;
            if visible {
                add_edge(&mut edges, i, j);
                add_edge(&mut edges, j, k);
                add_edge(&mut edges, k, i);
            }
            !visible
        });

        for [i, j] in edges {
            let face = self.face(new_idx, i, j);
            self.faces.push(face);
        }
    }
}

/// Add an edge to the edge list, removing it instead if its reverse is
/// already there (shared by two removed faces).
fn add_edge(edges: &mut Vec<[usize; 2]>, a: usize, b: usize) {
    if let Some(pos) = edges.iter().position(|e| e[0] == b && e[1] == a) {
        edges.swap_remove(pos);
    } else {
        edges.push([a, b]);
    }
}

/// Barycentric coordinates (u, v, w) of `p` with respect to triangle
/// (a, b, c).
fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Vec3::new(1.0 - v - w, v, w)
}

/// Expand `tetrahedron` until the closest face stops moving by more than
/// `growth_tolerance`, or `max_iterations` runs out.
///
/// Returns `None` when the polytope degenerates or the barycentric
/// reconstruction of the contact is out of range.
pub fn penetration(
    tetrahedron: &Tetrahedron,
    a: &Collider,
    b: &Collider,
    max_iterations: u32,
    growth_tolerance: f32,
) -> Option<Penetration> {
    let mut polytope = Polytope::from_tetrahedron(tetrahedron);
    let mut converged = false;
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let (closest, min_distance) = polytope.closest_face()?;
        let normal = polytope.faces[closest].normal;

        let point = minkowski_support(a, b, normal);
        if normal.dot(point.v) - min_distance < growth_tolerance {
            converged = true;
            break;
        }

        polytope.expand(point);
        if polytope.faces.is_empty() {
            return None;
        }
    }

    // Re-select after the loop: the last expansion may have replaced the
    // face found at the top of the final iteration.
    let (closest, depth) = polytope.closest_face()?;
    let face = polytope.faces[closest];
    let [i, j, k] = face.indices;
    let (p0, p1, p2) = (
        polytope.vertices[i],
        polytope.vertices[j],
        polytope.vertices[k],
    );

    let bary = barycentric(face.normal * depth, p0.v, p1.v, p2.v);
    if !bary.is_finite() || bary.abs().max_element() > 1.0 {
        tracing::trace!(?bary, "epa contact rejected");
        return None;
    }

    let point_a = p0.a * bary.x + p1.a * bary.y + p2.a * bary.z;
    let point_b = p0.b * bary.x + p1.b * bary.y + p2.b * bary.z;

    Some(Penetration {
        converged,
        iterations,
        contact: ContactData::new(point_a, point_b, face.normal, depth),
    })
}

#[cfg(test)]
mod tests {
    use super::super::gjk;
    use super::*;
    use crate::ecs::components::transform::Transform;

    fn placed(mut collider: Collider, position: Vec3) -> Collider {
        collider.refresh(&Transform::from_position(position), 1.0);
        collider
    }

    fn solve(a: &Collider, b: &Collider) -> Penetration {
        let tet = gjk::intersect(a, b, 64).expect("shapes overlap");
        penetration(&tet, a, b, 64, 1e-4).expect("valid contact")
    }

    #[test]
    fn test_epa_sphere_depth() {
        let a = placed(Collider::sphere(1.0), Vec3::ZERO);
        let b = placed(Collider::sphere(1.0), Vec3::new(1.5, 0.0, 0.0));

        let p = solve(&a, &b);
        assert!(p.converged);
        // Normal points from B toward A.
        assert!(p.contact.normal.dot(Vec3::NEG_X) > 0.99, "n = {}", p.contact.normal);
        assert!((p.contact.depth - 0.5).abs() < 0.02, "depth = {}", p.contact.depth);
    }

    #[test]
    fn test_epa_box_on_ground() {
        let a = placed(Collider::cuboid(Vec3::splat(0.5)), Vec3::new(0.0, 0.45, 0.0));
        let ground = placed(Collider::cuboid(Vec3::new(10.0, 0.5, 10.0)), Vec3::new(0.0, -0.5, 0.0));

        let p = solve(&a, &ground);
        assert!(p.converged);
        let eps = 1e-3;
        assert!((p.contact.normal - Vec3::Y).length() < eps, "n = {}", p.contact.normal);
        assert!((p.contact.depth - 0.05).abs() < eps, "depth = {}", p.contact.depth);

        // Witness points: A's bottom face and the ground's top face.
        assert!((p.contact.point_a.y - -0.05).abs() < eps);
        assert!(p.contact.point_b.y.abs() < eps);
        // Separating A along the normal by depth lifts it clear.
        let moved = a.position() + p.contact.normal * p.contact.depth;
        assert!((moved.y - 0.5).abs() < eps);
    }

    #[test]
    fn test_epa_reports_iterations() {
        let a = placed(Collider::sphere(1.0), Vec3::ZERO);
        let b = placed(Collider::sphere(0.5), Vec3::new(0.0, 1.2, 0.0));
        let tet = gjk::intersect(&a, &b, 64).unwrap();

        let capped = penetration(&tet, &a, &b, 1, 1e-4);
        if let Some(p) = capped {
            assert_eq!(p.iterations, 1);
            assert!(!p.converged);
        }

        let full = penetration(&tet, &a, &b, 64, 1e-4).unwrap();
        assert!(full.converged);
        assert!(full.iterations > 1);
        assert!((full.contact.depth - 0.3).abs() < 0.02);
    }

    #[test]
    fn test_add_edge_cancels_reverse() {
        let mut edges = Vec::new();
        add_edge(&mut edges, 0, 1);
        add_edge(&mut edges, 1, 2);
        add_edge(&mut edges, 1, 0);
        assert_eq!(edges, vec![[1, 2]]);
    }

    #[test]
    fn test_barycentric_of_vertex_and_centroid() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        let c = Vec3::Y;
        let eps = 1e-6;
        assert!((barycentric(a, a, b, c) - Vec3::new(1.0, 0.0, 0.0)).length() < eps);
        let centroid = (a + b + c) / 3.0;
        assert!((barycentric(centroid, a, b, c) - Vec3::splat(1.0 / 3.0)).length() < eps);
        // Degenerate triangle yields non-finite weights.
        assert!(!barycentric(a, a, a, b).is_finite());
    }
}
