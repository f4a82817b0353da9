//! Query rays

use crate::core::types::Vec3;
use super::aabb::Aabb;

/// A ray with a cached reciprocal direction
///
/// The reciprocal is taken once at construction so slab tests reduce to two
/// multiplies per axis. Axes the ray does not move along come out infinite,
/// which the slab arithmetic absorbs.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    recip_dir: Vec3,
}

impl Ray {
    /// Create a ray; callers are expected to pass a normalized direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            recip_dir: direction.recip(),
        }
    }

    /// Position on the ray at parameter `t`
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Clip the ray against an AABB (slab test)
    ///
    /// Returns the parameter interval `(enter, exit)` the ray spends inside
    /// the box, with `enter` clamped to 0 for origins inside it, or None when
    /// the box is missed or lies entirely behind the origin.
    pub fn clip_aabb(&self, aabb: &Aabb) -> Option<(f32, f32)> {
        let lo = (aabb.min - self.origin) * self.recip_dir;
        let hi = (aabb.max - self.origin) * self.recip_dir;

        let enter = lo.min(hi).max_element();
        let exit = lo.max(hi).min_element();

        // Positive form so NaN slabs (origin on a degenerate axis) reject
        if enter <= exit && exit >= 0.0 {
            Some((enter.max(0.0), exit))
        } else {
            None
        }
    }
}
