//! GJK intersection test over the Minkowski difference of two colliders.

use glam::Vec3;

use crate::ecs::components::physics::Collider;

use super::{minkowski_support, SupportPoint};

/// Relative tolerance below which a segment's perpendicular search
/// direction is treated as degenerate.
const LINE_DEGENERACY: f32 = 1e-5;
/// Relative tolerance for the first fallback axis.
const FALLBACK_DEGENERACY: f32 = 1e-10;
/// The origin must be this far (relative) outside a face plane to count as
/// outside. Points on the plane count as enclosed.
const FACE_TOLERANCE: f32 = 1e-5;

/// Terminal simplex of a successful GJK run. It encloses the origin and
/// seeds EPA.
#[derive(Debug, Clone, Copy)]
pub struct Tetrahedron {
    pub a: SupportPoint,
    pub b: SupportPoint,
    pub c: SupportPoint,
    pub d: SupportPoint,
}

/// Simplex kept between iterations. The newest support point `a` is added
/// on top of it each iteration.
#[derive(Debug, Clone, Copy)]
enum Simplex {
    Line {
        b: SupportPoint,
        c: SupportPoint,
    },
    /// Wound so that (c - b) x (d - b) faces the origin.
    Triangle {
        b: SupportPoint,
        c: SupportPoint,
        d: SupportPoint,
    },
}

enum Step {
    Continue(Simplex, Vec3),
    Enclosed(Tetrahedron),
}

/// Run GJK on `a` and `b`.
///
/// Returns the enclosing tetrahedron when the shapes intersect. `None` means
/// separated, or that `max_iterations` ran out without a verdict.
pub fn intersect(a: &Collider, b: &Collider, max_iterations: u32) -> Option<Tetrahedron> {
    let mut search = a.position() - b.position();
    if search == Vec3::ZERO {
        search = Vec3::X;
    }

    let c = minkowski_support(a, b, search);
    search = -c.v;
    let first = minkowski_support(a, b, search);
    if first.v.dot(search) < 0.0 {
        return None;
    }
    search = line_direction(c.v - first.v, -first.v);
    let mut simplex = Simplex::Line { b: first, c };

    for _ in 0..max_iterations {
        let point = minkowski_support(a, b, search);
        if point.v.dot(search) < 0.0 {
            return None;
        }

        let step = match simplex {
            Simplex::Line { b, c } => {
                let (next, dir) = update_triangle(point, b, c);
                Step::Continue(next, dir)
            }
            Simplex::Triangle { b, c, d } => update_tetrahedron(point, b, c, d),
        };

        match step {
            Step::Continue(next, dir) => {
                simplex = next;
                search = dir;
            }
            Step::Enclosed(tetrahedron) => return Some(tetrahedron),
        }
    }

    tracing::trace!(max_iterations, "gjk hit iteration cap");
    None
}

/// Direction perpendicular to `edge`, pointing toward the origin as seen
/// from `ao`. Falls back to fixed axes when the origin is co-linear with the
/// edge.
fn line_direction(edge: Vec3, ao: Vec3) -> Vec3 {
    let dir = edge.cross(ao).cross(edge);
    let edge_sq = edge.length_squared();
    let scale = edge_sq * (edge_sq * ao.length_squared()).sqrt();
    if dir.length_squared() > (LINE_DEGENERACY * scale).powi(2) {
        return dir;
    }

    let dir = edge.cross(Vec3::X);
    if dir.length_squared() > FALLBACK_DEGENERACY * edge_sq {
        dir
    } else {
        edge.cross(Vec3::NEG_Z)
    }
}

/// Three points: find the Voronoi region of triangle (a, b, c) holding the
/// origin.
fn update_triangle(a: SupportPoint, b: SupportPoint, c: SupportPoint) -> (Simplex, Vec3) {
    let ab = b.v - a.v;
    let ac = c.v - a.v;
    let ao = -a.v;
    let normal = ab.cross(ac);

    if ab.cross(normal).dot(ao) > 0.0 {
        (Simplex::Line { b, c: a }, line_direction(ab, ao))
    } else if normal.cross(ac).dot(ao) > 0.0 {
        (Simplex::Line { b: a, c }, line_direction(ac, ao))
    } else if normal.dot(ao) > 0.0 {
        (Simplex::Triangle { b: a, c: b, d: c }, normal)
    } else {
        (Simplex::Triangle { b: a, c, d: b }, -normal)
    }
}

/// Four points: test the origin against the faces sharing the newest point.
fn update_tetrahedron(a: SupportPoint, b: SupportPoint, c: SupportPoint, d: SupportPoint) -> Step {
    let ao = -a.v;
    let ab = b.v - a.v;
    let ac = c.v - a.v;
    let ad = d.v - a.v;

    let abc = ab.cross(ac);
    let acd = ac.cross(ad);
    let adb = ad.cross(ab);

    let ao_len = ao.length();
    let outside = |face: Vec3| face.dot(ao) > FACE_TOLERANCE * face.length() * ao_len;

    if outside(abc) {
        Step::Continue(Simplex::Triangle { b: a, c: b, d: c }, abc)
    } else if outside(acd) {
        Step::Continue(Simplex::Triangle { b: a, c, d }, acd)
    } else if outside(adb) {
        Step::Continue(Simplex::Triangle { b: a, c: d, d: b }, adb)
    } else {
        Step::Enclosed(Tetrahedron { a, b, c, d })
    }
}
