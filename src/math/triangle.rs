//! Triangle primitives: bounds, closest point, ray intersection

use crate::core::types::Vec3;
use super::aabb::Aabb;
use super::ray::Ray;

/// A triangle defined by three vertices
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

/// A point on a triangle surface with its barycentric coordinates
#[derive(Clone, Copy, Debug)]
pub struct SurfacePoint {
    pub point: Vec3,
    /// Barycentric coordinates with respect to (a, b, c); sum to 1, all >= 0
    pub bary: Vec3,
}

/// Ray-triangle intersection record
#[derive(Clone, Copy, Debug)]
pub struct TriangleHit {
    /// Ray parameter at the hit
    pub t: f32,
    pub point: Vec3,
    /// Barycentric coordinates of the hit with respect to (a, b, c)
    pub bary: Vec3,
}

impl Triangle {
    /// Create a triangle from three vertices
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Bounding box of the triangle
    pub fn aabb(&self) -> Aabb {
        Aabb {
            min: self.a.min(self.b).min(self.c),
            max: self.a.max(self.b).max(self.c),
        }
    }

    /// Centroid of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    /// Closest point on the triangle to `p` (Ericson's Voronoi-region walk)
    ///
    /// Regions are tested in a fixed order (vertex a, vertex b, edge ab,
    /// vertex c, edge ac, edge bc, interior), which makes the result
    /// deterministic when `p` is equidistant to several features.
    pub fn closest_point(&self, p: Vec3) -> SurfacePoint {
        let ab = self.b - self.a;
        let ac = self.c - self.a;
        let ap = p - self.a;

        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return SurfacePoint { point: self.a, bary: Vec3::new(1.0, 0.0, 0.0) };
        }

        let bp = p - self.b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            return SurfacePoint { point: self.b, bary: Vec3::new(0.0, 1.0, 0.0) };
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return SurfacePoint {
                point: self.a + ab * v,
                bary: Vec3::new(1.0 - v, v, 0.0),
            };
        }

        let cp = p - self.c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);
        if d6 >= 0.0 && d5 <= d6 {
            return SurfacePoint { point: self.c, bary: Vec3::new(0.0, 0.0, 1.0) };
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return SurfacePoint {
                point: self.a + ac * w,
                bary: Vec3::new(1.0 - w, 0.0, w),
            };
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return SurfacePoint {
                point: self.b + (self.c - self.b) * w,
                bary: Vec3::new(0.0, 1.0 - w, w),
            };
        }

        // Interior of the face
        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        SurfacePoint {
            point: self.a + ab * v + ac * w,
            bary: Vec3::new(1.0 - v - w, v, w),
        }
    }

    /// Ray-triangle intersection (Moller-Trumbore)
    ///
    /// Returns None for misses, hits behind the origin, and rays parallel
    /// to the triangle plane (including degenerate triangles).
    pub fn intersect(&self, ray: &Ray) -> Option<TriangleHit> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;

        let pvec = ray.direction.cross(e2);
        let det = e1.dot(pvec);
        if det.abs() < f32::EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin - self.a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(e1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(qvec) * inv_det;
        if t < 0.0 {
            return None;
        }

        Some(TriangleHit {
            t,
            point: ray.point_at(t),
            bary: Vec3::new(1.0 - u - v, u, v),
        })
    }
}
