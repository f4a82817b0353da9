//! Tetrahedron primitives: containment and barycentric coordinates

use crate::core::types::{Vec3, Vec4};
use super::triangle::Triangle;

/// Six times the signed volume of the tetrahedron (a, b, c, d)
fn signed_volume(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> f32 {
    (b - a).cross(c - a).dot(d - a)
}

/// A tetrahedron stored as its four triangular faces
///
/// Faces are expected to share vertices bit-exactly (they come from a common
/// vertex buffer), which is what the vertex reconstruction relies on.
#[derive(Clone, Copy, Debug)]
pub struct Tetrahedron {
    pub faces: [Triangle; 4],
}

impl Tetrahedron {
    /// Create a tetrahedron from its four faces
    pub fn from_faces(faces: [Triangle; 4]) -> Self {
        Self { faces }
    }

    /// Create a tetrahedron from four vertices; face i is opposite vertex i
    pub fn from_vertices(v0: Vec3, v1: Vec3, v2: Vec3, v3: Vec3) -> Self {
        Self {
            faces: [
                Triangle::new(v1, v2, v3),
                Triangle::new(v0, v3, v2),
                Triangle::new(v0, v1, v3),
                Triangle::new(v0, v2, v1),
            ],
        }
    }

    /// Reconstruct the four vertices from the faces
    ///
    /// The first face contributes three vertices; the fourth is the vertex of
    /// a remaining face that does not lie on the first.
    pub fn vertices(&self) -> [Vec3; 4] {
        let f0 = self.faces[0];
        let mut v3 = f0.a;
        'search: for f in &self.faces[1..] {
            for v in [f.a, f.b, f.c] {
                if v != f0.a && v != f0.b && v != f0.c {
                    v3 = v;
                    break 'search;
                }
            }
        }
        [f0.a, f0.b, f0.c, v3]
    }

    /// Point containment via four same-side tests
    ///
    /// For each face, the point must lie on the same side as the vertex
    /// opposite that face. Points exactly on a face count as inside.
    pub fn contains(&self, p: Vec3) -> bool {
        let verts = self.vertices();
        for face in &self.faces {
            let Some(&r) = verts
                .iter()
                .find(|&&v| v != face.a && v != face.b && v != face.c)
            else {
                return false;
            };
            let side_p = signed_volume(face.a, face.b, face.c, p);
            let side_r = signed_volume(face.a, face.b, face.c, r);
            if side_p * side_r < 0.0 {
                return false;
            }
        }
        true
    }

    /// Barycentric coordinates of `p` as ratios of scalar triple products
    ///
    /// Components sum to 1; the point lies inside the tetrahedron iff all
    /// components are non-negative.
    pub fn barycentric(&self, p: Vec3) -> Vec4 {
        let [v0, v1, v2, v3] = self.vertices();
        let vol = signed_volume(v0, v1, v2, v3);
        Vec4::new(
            signed_volume(p, v1, v2, v3) / vol,
            signed_volume(v0, p, v2, v3) / vol,
            signed_volume(v0, v1, p, v3) / vol,
            signed_volume(v0, v1, v2, p) / vol,
        )
    }
}
