//! Tetrahedral ray marching through face adjacency
//!
//! Each ray starts inside a given tetrahedron and walks neighbor-to-neighbor
//! through shared faces, emitting uniformly spaced samples tagged with the
//! containing tetrahedron and its barycentric coordinates. One ray is one
//! worker.

use rayon::prelude::*;
use std::time::Instant;

use crate::core::error::Error;
use crate::core::types::{Result, Vec3, Vec4};
use crate::math::{Ray, Tetrahedron};

/// Volumetric tetrahedral mesh with face adjacency
#[derive(Clone, Debug)]
pub struct TetraMesh {
    tetras: Vec<Tetrahedron>,
    /// Four neighbor ids per tetra, one per face, -1 on the boundary
    neighbors: Vec<[i32; 4]>,
}

impl TetraMesh {
    /// Create a mesh; the adjacency table must have one entry per tetra
    pub fn new(tetras: Vec<Tetrahedron>, neighbors: Vec<[i32; 4]>) -> Result<Self> {
        if neighbors.len() != tetras.len() {
            return Err(Error::Topology {
                got: neighbors.len(),
                expected: tetras.len(),
            });
        }
        Ok(Self { tetras, neighbors })
    }

    /// Tetrahedra as a slice
    pub fn tetras(&self) -> &[Tetrahedron] {
        &self.tetras
    }

    /// Face adjacency as a slice
    pub fn neighbors(&self) -> &[[i32; 4]] {
        &self.neighbors
    }

    /// Number of tetrahedra
    pub fn len(&self) -> usize {
        self.tetras.len()
    }

    /// True if the mesh has no tetrahedra
    pub fn is_empty(&self) -> bool {
        self.tetras.is_empty()
    }
}

/// Configuration for ray marching
#[derive(Clone, Copy, Debug)]
pub struct MarchConfig {
    /// Uniform ray-parameter step between samples
    pub step: f32,
    /// Maximum samples emitted per ray
    pub max_samples: usize,
    /// Rays whose start parameter exceeds this are skipped entirely; a
    /// caller contract inherited from upstream users of the walker
    pub max_start_t: f32,
}

impl Default for MarchConfig {
    fn default() -> Self {
        Self {
            step: 0.1,
            max_samples: 128,
            max_start_t: 10.0,
        }
    }
}

/// Flat per-ray sample buffers; each ray owns `stride` consecutive slots
///
/// Slots beyond the emitted count keep their sentinels (`tetra_indices`
/// and `ray_indices` -1, everything else zero).
#[derive(Clone, Debug, Default)]
pub struct MarchResults {
    /// Emitted sample count per ray
    pub counts: Vec<u32>,
    /// Ray id per sample slot, -1 where unused
    pub ray_indices: Vec<i32>,
    /// Containing tetra per sample slot, -1 where unused
    pub tetra_indices: Vec<i32>,
    /// Barycentric coordinates of each sample within its tetra
    pub barycentrics: Vec<Vec4>,
    /// Ray parameter at each sample
    pub t_start: Vec<f32>,
    /// Ray parameter one step past each sample
    pub t_end: Vec<f32>,
    /// Sample positions
    pub positions: Vec<Vec3>,
    /// Slots per ray
    pub stride: usize,
}

struct Sample {
    position: Vec3,
    tetra: i32,
    bary: Vec4,
    t_start: f32,
    t_end: f32,
}

/// Earliest forward face hit of the current tetra and the neighbor behind it
///
/// The face shared with `prev` is skipped so the walker cannot step back
/// through the face it just crossed. A boundary exit is reported with
/// neighbor -1; None means the ray hits no face at all.
fn find_exit(mesh: &TetraMesh, ray: &Ray, current: i32, prev: i32) -> Option<(f32, i32)> {
    let tet = &mesh.tetras[current as usize];
    let nbrs = &mesh.neighbors[current as usize];
    let mut best: Option<(f32, i32)> = None;
    for (face, &nbr) in tet.faces.iter().zip(nbrs) {
        if nbr == prev {
            continue;
        }
        let Some(hit) = face.intersect(ray) else {
            continue;
        };
        if hit.t <= 0.0 {
            continue;
        }
        // Earliest face in iteration order wins ties
        if best.is_none_or(|(t, _)| hit.t < t) {
            best = Some((hit.t, nbr));
        }
    }
    best
}

fn march_ray(
    mesh: &TetraMesh,
    ray: &Ray,
    start_tet: i32,
    start_t: f32,
    cfg: &MarchConfig,
) -> Vec<Sample> {
    let mut samples = Vec::new();
    if start_t > cfg.max_start_t {
        return samples;
    }
    if start_tet < 0 || start_tet as usize >= mesh.len() {
        return samples;
    }

    let mut t = start_t;
    let mut prev = start_tet;
    let mut current = start_tet;
    // With prev == current nothing is excluded on the first search
    let Some((mut exit_t, mut next)) = find_exit(mesh, ray, current, prev) else {
        return samples;
    };

    while samples.len() < cfg.max_samples {
        let tet = &mesh.tetras[current as usize];
        let p = ray.point_at(t);
        samples.push(Sample {
            position: p,
            tetra: current,
            bary: tet.barycentric(p),
            t_start: t,
            t_end: t + cfg.step,
        });
        t += cfg.step;

        // Cross as many shared faces as the step passed over
        while t > exit_t {
            if next < 0 {
                return samples;
            }
            prev = current;
            current = next;
            match find_exit(mesh, ray, current, prev) {
                Some((et, nx)) => {
                    exit_t = et;
                    next = nx;
                }
                None => return samples,
            }
        }
    }
    samples
}

/// March each ray from its start tetrahedron, emitting uniform-step samples
pub fn march_rays(
    mesh: &TetraMesh,
    rays: &[Ray],
    start_tets: &[i32],
    start_ts: &[f32],
    cfg: &MarchConfig,
) -> Result<MarchResults> {
    if start_tets.len() != rays.len() {
        return Err(Error::ShapeMismatch {
            what: "start_tets",
            got: start_tets.len(),
            expected: rays.len(),
        });
    }
    if start_ts.len() != rays.len() {
        return Err(Error::ShapeMismatch {
            what: "start_ts",
            got: start_ts.len(),
            expected: rays.len(),
        });
    }

    let start = Instant::now();
    let per_ray: Vec<Vec<Sample>> = rays
        .par_iter()
        .zip(start_tets)
        .zip(start_ts)
        .map(|((ray, &tet), &t0)| march_ray(mesh, ray, tet, t0, cfg))
        .collect();

    let stride = cfg.max_samples;
    let slots = rays.len() * stride;
    let mut out = MarchResults {
        counts: Vec::with_capacity(rays.len()),
        ray_indices: vec![-1; slots],
        tetra_indices: vec![-1; slots],
        barycentrics: vec![Vec4::ZERO; slots],
        t_start: vec![0.0; slots],
        t_end: vec![0.0; slots],
        positions: vec![Vec3::ZERO; slots],
        stride,
    };
    for (ray_id, samples) in per_ray.into_iter().enumerate() {
        out.counts.push(samples.len() as u32);
        let base = ray_id * stride;
        for (s, sample) in samples.into_iter().enumerate() {
            out.ray_indices[base + s] = ray_id as i32;
            out.tetra_indices[base + s] = sample.tetra;
            out.barycentrics[base + s] = sample.bary;
            out.t_start[base + s] = sample.t_start;
            out.t_end[base + s] = sample.t_end;
            out.positions[base + s] = sample.position;
        }
    }

    log::debug!(
        "marched {} rays over {} tetras in {:.2}ms",
        rays.len(),
        mesh.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(out)
}

/// March a batch of tetra meshes, one ray slice per batch element
pub fn march_rays_batch(
    meshes: &[TetraMesh],
    rays: &[Vec<Ray>],
    start_tets: &[Vec<i32>],
    start_ts: &[Vec<f32>],
    cfg: &MarchConfig,
) -> Result<Vec<MarchResults>> {
    for (what, len) in [
        ("rays", rays.len()),
        ("start_tets", start_tets.len()),
        ("start_ts", start_ts.len()),
    ] {
        if len != meshes.len() {
            return Err(Error::ShapeMismatch {
                what,
                got: len,
                expected: meshes.len(),
            });
        }
    }
    meshes
        .iter()
        .zip(rays)
        .zip(start_tets)
        .zip(start_ts)
        .map(|(((mesh, r), tets), ts)| march_rays(mesh, r, tets, ts, cfg))
        .collect()
}
