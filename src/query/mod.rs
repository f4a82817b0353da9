//! Batched query orchestration
//!
//! Builds one LBVH per batch element and fans queries out over workers, one
//! worker per query. Batch elements are processed in order; everything inside
//! an element runs in parallel.

use rayon::prelude::*;
use std::time::Instant;

use crate::bvh::{traverse, Bvh, PointResult, RayResult};
use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::math::{morton, Ray};
use crate::mesh::TriangleMesh;

/// Traversal algorithm selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Traversal {
    /// Depth-first with an explicit stack
    #[default]
    Stack,
    /// Best-first with a priority queue; visits fewer leaves at a higher
    /// per-operation cost
    BestFirst,
}

/// Configuration for batched queries
#[derive(Clone, Copy, Debug)]
pub struct QueryConfig {
    pub traversal: Traversal,
    /// Per-worker stack or queue capacity; one of 32/64/128/256/512/1024
    pub capacity: usize,
    /// Reorder queries along a Morton curve before traversal for memory
    /// coherence; results are unaffected
    pub sort_queries: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            traversal: Traversal::Stack,
            capacity: 64,
            sort_queries: false,
        }
    }
}

/// Nearest-surface results in structure-of-arrays form
#[derive(Clone, Debug, Default)]
pub struct NearestResults {
    /// Squared distance to the surface per query, +inf for empty meshes
    pub distances_sq: Vec<f32>,
    /// Closest surface point per query
    pub points: Vec<Vec3>,
    /// Attaining triangle id per query, -1 for empty meshes
    pub faces: Vec<i32>,
    /// Barycentric coordinates of the closest point on its triangle
    pub barycentrics: Vec<Vec3>,
}

/// Ray-intersection results in structure-of-arrays form
#[derive(Clone, Debug, Default)]
pub struct RayResults {
    /// Ray parameter of the nearest hit per query, +inf on miss
    pub distances: Vec<f32>,
    /// Hit point per query
    pub points: Vec<Vec3>,
    /// Hit triangle id per query, -1 on miss
    pub faces: Vec<i32>,
    /// Barycentric coordinates of the hit on its triangle
    pub barycentrics: Vec<Vec3>,
}

fn check_capacity(cfg: &QueryConfig) -> Result<()> {
    match cfg.capacity {
        32 | 64 | 128 | 256 | 512 | 1024 => Ok(()),
        capacity => Err(Error::InvalidCapacity { capacity }),
    }
}

fn check_batch_len<T>(what: &'static str, got: &[T], expected: usize) -> Result<()> {
    if got.len() == expected {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            what,
            got: got.len(),
            expected,
        })
    }
}

/// Morton permutation of queries keyed in the fixed [-1, 1] cube
fn morton_order(positions: impl Iterator<Item = Vec3>, len: usize) -> Vec<u32> {
    let codes: Vec<u32> = positions
        .map(|p| morton::morton_from_unit((p + Vec3::ONE) * 0.5))
        .collect();
    let mut order: Vec<u32> = (0..len as u32).collect();
    order.sort_by_key(|&i| codes[i as usize]);
    order
}

fn points_with_cap<const CAP: usize>(
    bvh: &Bvh,
    points: &[Vec3],
    traversal: Traversal,
) -> Vec<PointResult> {
    match traversal {
        Traversal::Stack => points
            .par_iter()
            .map(|&p| traverse::nearest_point_stack::<CAP>(bvh, p))
            .collect(),
        Traversal::BestFirst => points
            .par_iter()
            .map(|&p| traverse::nearest_point_best_first::<CAP>(bvh, p))
            .collect(),
    }
}

fn rays_with_cap<const CAP: usize>(
    bvh: &Bvh,
    rays: &[Ray],
    traversal: Traversal,
) -> Vec<RayResult> {
    match traversal {
        Traversal::Stack => rays
            .par_iter()
            .map(|r| traverse::nearest_hit_stack::<CAP>(bvh, r))
            .collect(),
        Traversal::BestFirst => rays
            .par_iter()
            .map(|r| traverse::nearest_hit_best_first::<CAP>(bvh, r))
            .collect(),
    }
}

fn run_points(bvh: &Bvh, points: &[Vec3], cfg: &QueryConfig) -> Vec<PointResult> {
    match cfg.capacity {
        32 => points_with_cap::<32>(bvh, points, cfg.traversal),
        64 => points_with_cap::<64>(bvh, points, cfg.traversal),
        128 => points_with_cap::<128>(bvh, points, cfg.traversal),
        256 => points_with_cap::<256>(bvh, points, cfg.traversal),
        512 => points_with_cap::<512>(bvh, points, cfg.traversal),
        _ => points_with_cap::<1024>(bvh, points, cfg.traversal),
    }
}

fn run_rays(bvh: &Bvh, rays: &[Ray], cfg: &QueryConfig) -> Vec<RayResult> {
    match cfg.capacity {
        32 => rays_with_cap::<32>(bvh, rays, cfg.traversal),
        64 => rays_with_cap::<64>(bvh, rays, cfg.traversal),
        128 => rays_with_cap::<128>(bvh, rays, cfg.traversal),
        256 => rays_with_cap::<256>(bvh, rays, cfg.traversal),
        512 => rays_with_cap::<512>(bvh, rays, cfg.traversal),
        _ => rays_with_cap::<1024>(bvh, rays, cfg.traversal),
    }
}

/// Gathered results written back through the inverse permutation
fn scatter<T: Copy>(computed: Vec<T>, order: &[u32]) -> Vec<T> {
    // order is a permutation, so every slot is overwritten
    let mut out = computed.clone();
    for (k, r) in computed.into_iter().enumerate() {
        out[order[k] as usize] = r;
    }
    out
}

/// Nearest surface point on one mesh for each query point
pub fn nearest_surface_points(
    mesh: &TriangleMesh,
    points: &[Vec3],
    cfg: &QueryConfig,
) -> Result<NearestResults> {
    let mut out = NearestResults::default();
    nearest_surface_points_into(mesh, points, cfg, &mut out)?;
    Ok(out)
}

/// Nearest surface point query writing into caller-owned buffers
pub fn nearest_surface_points_into(
    mesh: &TriangleMesh,
    points: &[Vec3],
    cfg: &QueryConfig,
    out: &mut NearestResults,
) -> Result<()> {
    check_capacity(cfg)?;
    let start = Instant::now();
    let bvh = Bvh::build(mesh.triangles());

    let hits = if cfg.sort_queries {
        let order = morton_order(points.iter().copied(), points.len());
        let gathered: Vec<Vec3> = order.iter().map(|&i| points[i as usize]).collect();
        scatter(run_points(&bvh, &gathered, cfg), &order)
    } else {
        run_points(&bvh, points, cfg)
    };

    out.distances_sq.clear();
    out.points.clear();
    out.faces.clear();
    out.barycentrics.clear();
    for hit in hits {
        out.distances_sq.push(hit.distance_sq);
        out.points.push(hit.point);
        out.faces.push(hit.face);
        out.barycentrics.push(hit.bary);
    }

    log::debug!(
        "nearest-surface: {} queries over {} triangles in {:.2}ms",
        points.len(),
        mesh.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

/// Nearest surface point per query over a batch of meshes
pub fn nearest_surface_points_batch(
    meshes: &[TriangleMesh],
    points: &[Vec<Vec3>],
    cfg: &QueryConfig,
) -> Result<Vec<NearestResults>> {
    check_batch_len("points", points, meshes.len())?;
    meshes
        .iter()
        .zip(points)
        .map(|(mesh, pts)| nearest_surface_points(mesh, pts, cfg))
        .collect()
}

/// Nearest triangle hit on one mesh for each query ray
pub fn ray_intersections(
    mesh: &TriangleMesh,
    rays: &[Ray],
    cfg: &QueryConfig,
) -> Result<RayResults> {
    let mut out = RayResults::default();
    ray_intersections_into(mesh, rays, cfg, &mut out)?;
    Ok(out)
}

/// Ray intersection query writing into caller-owned buffers
pub fn ray_intersections_into(
    mesh: &TriangleMesh,
    rays: &[Ray],
    cfg: &QueryConfig,
    out: &mut RayResults,
) -> Result<()> {
    check_capacity(cfg)?;
    let start = Instant::now();
    let bvh = Bvh::build(mesh.triangles());

    let hits = if cfg.sort_queries {
        let order = morton_order(rays.iter().map(|r| r.origin), rays.len());
        let gathered: Vec<Ray> = order.iter().map(|&i| rays[i as usize]).collect();
        scatter(run_rays(&bvh, &gathered, cfg), &order)
    } else {
        run_rays(&bvh, rays, cfg)
    };

    out.distances.clear();
    out.points.clear();
    out.faces.clear();
    out.barycentrics.clear();
    for hit in hits {
        out.distances.push(hit.distance);
        out.points.push(hit.point);
        out.faces.push(hit.face);
        out.barycentrics.push(hit.bary);
    }

    log::debug!(
        "ray-nearest-hit: {} rays over {} triangles in {:.2}ms",
        rays.len(),
        mesh.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

/// Nearest triangle hit per ray over a batch of meshes
pub fn ray_intersections_batch(
    meshes: &[TriangleMesh],
    rays: &[Vec<Ray>],
    cfg: &QueryConfig,
) -> Result<Vec<RayResults>> {
    check_batch_len("rays", rays, meshes.len())?;
    meshes
        .iter()
        .zip(rays)
        .map(|(mesh, r)| ray_intersections(mesh, r, cfg))
        .collect()
}

/// Vector from the closest surface point to each query point
///
/// Zero for queries lying on the surface; the norm is the unsquared surface
/// distance.
pub fn point_to_mesh_residuals(
    mesh: &TriangleMesh,
    points: &[Vec3],
    cfg: &QueryConfig,
) -> Result<Vec<Vec3>> {
    let results = nearest_surface_points(mesh, points, cfg)?;
    Ok(points
        .iter()
        .zip(&results.points)
        .map(|(&p, &c)| p - c)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Triangle;

    fn grid_mesh(side: usize) -> TriangleMesh {
        let mut tris = Vec::new();
        for gy in 0..side {
            for gx in 0..side {
                let o = Vec3::new(gx as f32, gy as f32, 0.0);
                tris.push(Triangle::new(o, o + Vec3::X, o + Vec3::Y));
                tris.push(Triangle::new(
                    o + Vec3::X,
                    o + Vec3::new(1.0, 1.0, 0.0),
                    o + Vec3::Y,
                ));
            }
        }
        TriangleMesh::new(tris)
    }

    fn scattered_points(count: usize) -> Vec<Vec3> {
        (0..count)
            .map(|i| {
                let f = i as f32;
                Vec3::new(
                    (f * 0.677).sin(),
                    (f * 1.131).cos(),
                    (f * 0.389).sin() * (f * 0.851).cos(),
                )
            })
            .collect()
    }

    #[test]
    fn test_invalid_capacity() {
        let mesh = grid_mesh(2);
        let cfg = QueryConfig {
            capacity: 48,
            ..Default::default()
        };
        let err = nearest_surface_points(&mesh, &[Vec3::ZERO], &cfg).unwrap_err();
        assert!(matches!(err, Error::InvalidCapacity { capacity: 48 }));
    }

    #[test]
    fn test_batch_shape_mismatch() {
        let meshes = vec![grid_mesh(1), grid_mesh(2)];
        let points = vec![vec![Vec3::ZERO]];
        let err = nearest_surface_points_batch(&meshes, &points, &Default::default()).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_stack_and_best_first_agree() {
        let mesh = grid_mesh(3);
        let points = scattered_points(40);
        let stack = nearest_surface_points(&mesh, &points, &Default::default()).unwrap();
        let best = nearest_surface_points(
            &mesh,
            &points,
            &QueryConfig {
                traversal: Traversal::BestFirst,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(stack.distances_sq, best.distances_sq);
        assert_eq!(stack.faces, best.faces);
        assert_eq!(stack.points, best.points);
    }

    #[test]
    fn test_sorted_queries_match_unsorted() {
        let mesh = grid_mesh(3);
        let points = scattered_points(50);
        let plain = nearest_surface_points(&mesh, &points, &Default::default()).unwrap();
        let sorted = nearest_surface_points(
            &mesh,
            &points,
            &QueryConfig {
                sort_queries: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plain.distances_sq, sorted.distances_sq);
        assert_eq!(plain.faces, sorted.faces);
        assert_eq!(plain.points, sorted.points);
        assert_eq!(plain.barycentrics, sorted.barycentrics);
    }

    #[test]
    fn test_sorted_rays_match_unsorted() {
        let mesh = grid_mesh(3);
        let rays: Vec<Ray> = scattered_points(30)
            .into_iter()
            .map(|p| Ray::new(p + Vec3::Z * 2.0, -Vec3::Z))
            .collect();
        let plain = ray_intersections(&mesh, &rays, &Default::default()).unwrap();
        let sorted = ray_intersections(
            &mesh,
            &rays,
            &QueryConfig {
                sort_queries: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plain.distances, sorted.distances);
        assert_eq!(plain.faces, sorted.faces);
    }

    #[test]
    fn test_empty_mesh_reports_misses() {
        let mesh = TriangleMesh::default();
        let out = nearest_surface_points(&mesh, &[Vec3::ZERO, Vec3::ONE], &Default::default())
            .unwrap();
        assert_eq!(out.faces, vec![-1, -1]);
        assert!(out.distances_sq.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_ray_miss_is_infinite() {
        let mesh = grid_mesh(2);
        let rays = [Ray::new(Vec3::new(0.5, 0.5, 1.0), Vec3::Z)];
        let out = ray_intersections(&mesh, &rays, &Default::default()).unwrap();
        assert_eq!(out.faces[0], -1);
        assert_eq!(out.distances[0], f32::INFINITY);
    }

    #[test]
    fn test_batch_runs_per_element() {
        let meshes = vec![grid_mesh(1), grid_mesh(2)];
        let points = vec![vec![Vec3::new(0.3, 0.3, 1.0)], vec![Vec3::new(1.5, 1.5, -2.0)]];
        let out = nearest_surface_points_batch(&meshes, &points, &Default::default()).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[0].distances_sq[0] - 1.0).abs() < 1e-6);
        assert!((out[1].distances_sq[0] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_into_reuses_buffers() {
        let mesh = grid_mesh(2);
        let mut out = NearestResults::default();
        nearest_surface_points_into(&mesh, &scattered_points(8), &Default::default(), &mut out)
            .unwrap();
        assert_eq!(out.faces.len(), 8);
        nearest_surface_points_into(&mesh, &scattered_points(3), &Default::default(), &mut out)
            .unwrap();
        assert_eq!(out.faces.len(), 3);
    }

    #[test]
    fn test_residuals_point_from_surface_to_query() {
        let mesh = grid_mesh(2);
        let points = vec![Vec3::new(0.4, 0.4, 2.5), Vec3::new(1.2, 0.7, -1.5)];
        let residuals = point_to_mesh_residuals(&mesh, &points, &Default::default()).unwrap();
        assert!((residuals[0] - Vec3::new(0.0, 0.0, 2.5)).length() < 1e-6);
        assert!((residuals[1] - Vec3::new(0.0, 0.0, -1.5)).length() < 1e-6);
    }

    #[test]
    fn test_all_capacities_accepted() {
        let mesh = grid_mesh(2);
        let points = [Vec3::new(0.5, 0.5, 1.0)];
        for capacity in [32, 64, 128, 256, 512, 1024] {
            let cfg = QueryConfig {
                capacity,
                ..Default::default()
            };
            let out = nearest_surface_points(&mesh, &points, &cfg).unwrap();
            assert!((out.distances_sq[0] - 1.0).abs() < 1e-6);
        }
    }
}
